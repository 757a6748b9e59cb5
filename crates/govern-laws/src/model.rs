//! The law data model (spec §3, §4.E) — one struct per variant plus the
//! `Resource` dispatch trait and the `LawSet` container.
//!
//! Per the "graph construction by reflection" redesign flag, there is no
//! runtime reflection here: `LawSet::vertices` is a plain explicit match
//! over each group/type bucket (see `graph.rs`).

use async_trait::async_trait;
use govern_facts::Facts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ResourceError;

/// Outcome of a single `ensure` call (spec §4.E).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChangeReport {
    Unchanged,
    WouldChange { reason: String },
    Changed { summary: String },
    Failed { error: String },
}

impl ChangeReport {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Single-method dispatch capability every law variant implements.
#[async_trait]
pub trait Resource: Send + Sync {
    async fn ensure(&self, dry_run: bool, facts: &Facts) -> Result<ChangeReport, ResourceError>;
}

fn default_true() -> bool {
    true
}

fn default_mode() -> u32 {
    0o644
}

fn default_options() -> String {
    "defaults".to_string()
}

fn default_started() -> String {
    "started".to_string()
}

fn default_level() -> String {
    "default".to_string()
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_container_labels() -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert("StartedBy".to_string(), "Govern".to_string());
    labels
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub home: Option<String>,
    pub fullname: Option<String>,
    /// Encrypted password hash, compared by equality against `/etc/shadow`.
    pub password: Option<String>,
    pub shell: Option<String>,
    /// Open Question (a): report-only unless explicitly opted in.
    pub reconcile_mismatches: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub name: String,
    pub gid: Option<u32>,
    pub system: bool,
    pub reconcile_mismatches: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for Package {
    fn default() -> Self {
        Self { name: String::new(), version: String::new(), installed: true, before: vec![], after: vec![] }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageRepo {
    pub name: String,
    pub contents: String,
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTemplate {
    pub name: String,
    pub text: String,
    #[serde(default = "default_mode")]
    pub mode: u32,
    pub make_dir: bool,
    pub backup: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for FileTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            text: String::new(),
            mode: default_mode(),
            make_dir: false,
            backup: false,
            before: vec![],
            after: vec![],
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInsert {
    pub name: String,
    pub text: String,
    /// Insertion mode (a): insert after the first line equal to this.
    pub after_line: Option<String>,
    /// Insertion mode (b): insert at this 1-based line number.
    pub line_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChange {
    pub name: String,
    pub search: String,
    pub replace: String,
    /// Open Question (b): optional convergence sentinel; absent means
    /// "always evaluate search/replace against every line".
    pub done: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLink {
    pub name: String,
    pub target: String,
    pub symbolic: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for FileLink {
    fn default() -> Self {
        Self { name: String::new(), target: String::new(), symbolic: true, before: vec![], after: vec![] }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Mount {
    /// Device/source spec, e.g. `/dev/sdb1`. Doubles as the law identity.
    pub spec: String,
    pub mount_point: String,
    #[serde(rename = "type")]
    pub fstype: String,
    #[serde(default = "default_options")]
    pub options: String,
    pub freq: u32,
    pub pass: u32,
    pub present: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for Mount {
    fn default() -> Self {
        Self {
            spec: String::new(),
            mount_point: String::new(),
            fstype: String::new(),
            options: default_options(),
            freq: 0,
            pass: 0,
            present: true,
            before: vec![],
            after: vec![],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub name: String,
    #[serde(default = "default_started")]
    pub state: String,
    #[serde(default = "default_true")]
    pub persistent: bool,
    #[serde(default = "default_level")]
    pub run_level: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            name: String::new(),
            state: default_started(),
            persistent: true,
            run_level: default_level(),
            before: vec![],
            after: vec![],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub name: String,
    /// Inline shell body, or a URL whose body is downloaded first.
    pub script: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creates: Vec<String>,
    /// `uid:gid` the child process's effective identity switches to.
    pub run_as: Option<String>,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            name: String::new(),
            script: String::new(),
            creates: vec![],
            run_as: None,
            shell: default_shell(),
            before: vec![],
            after: vec![],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default = "default_true")]
    pub running: bool,
    pub privileged: bool,
    #[serde(default = "default_container_labels")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    pub network: Option<String>,
    pub restart_policy: Option<String>,
    pub healthcheck: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            name: String::new(),
            image: String::new(),
            running: true,
            privileged: false,
            labels: default_container_labels(),
            volumes: vec![],
            environment: HashMap::new(),
            network: None,
            restart_policy: None,
            healthcheck: None,
            before: vec![],
            after: vec![],
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKey {
    /// The target local user whose `~/.ssh/authorized_keys` receives `key`.
    pub user: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
}

/// Tagged union of every law variant, plus the shared `(group, type, name)`
/// identity used for graph vertices. One dispatch trait (`Resource`), one
/// method (`ensure`) — the source's interface-based polymorphism collapsed
/// into a single `match`.
#[derive(Clone, Debug)]
pub enum Law {
    User(User),
    Group(Group),
    Package(Package),
    PackageRepo(PackageRepo),
    FileTemplate(FileTemplate),
    FileInsert(FileInsert),
    FileChange(FileChange),
    FileLink(FileLink),
    Mount(Mount),
    Service(Service),
    Script(Script),
    Container(Container),
    SshKey(SshKey),
}

impl Law {
    pub fn name(&self) -> &str {
        match self {
            Law::User(v) => &v.name,
            Law::Group(v) => &v.name,
            Law::Package(v) => &v.name,
            Law::PackageRepo(v) => &v.name,
            Law::FileTemplate(v) => &v.name,
            Law::FileInsert(v) => &v.name,
            Law::FileChange(v) => &v.name,
            Law::FileLink(v) => &v.name,
            Law::Mount(v) => &v.spec,
            Law::Service(v) => &v.name,
            Law::Script(v) => &v.name,
            Law::Container(v) => &v.name,
            Law::SshKey(v) => &v.user,
        }
    }

    pub fn before(&self) -> &[String] {
        match self {
            Law::User(v) => &v.before,
            Law::Group(v) => &v.before,
            Law::Package(v) => &v.before,
            Law::PackageRepo(v) => &v.before,
            Law::FileTemplate(v) => &v.before,
            Law::FileInsert(v) => &v.before,
            Law::FileChange(v) => &v.before,
            Law::FileLink(v) => &v.before,
            Law::Mount(v) => &v.before,
            Law::Service(v) => &v.before,
            Law::Script(v) => &v.before,
            Law::Container(v) => &v.before,
            Law::SshKey(v) => &v.before,
        }
    }

    pub fn after(&self) -> &[String] {
        match self {
            Law::User(v) => &v.after,
            Law::Group(v) => &v.after,
            Law::Package(v) => &v.after,
            Law::PackageRepo(v) => &v.after,
            Law::FileTemplate(v) => &v.after,
            Law::FileInsert(v) => &v.after,
            Law::FileChange(v) => &v.after,
            Law::FileLink(v) => &v.after,
            Law::Mount(v) => &v.after,
            Law::Service(v) => &v.after,
            Law::Script(v) => &v.after,
            Law::Container(v) => &v.after,
            Law::SshKey(v) => &v.after,
        }
    }
}

#[async_trait]
impl Resource for Law {
    async fn ensure(&self, dry_run: bool, facts: &Facts) -> Result<ChangeReport, ResourceError> {
        match self {
            Law::User(v) => v.ensure(dry_run, facts).await,
            Law::Group(v) => v.ensure(dry_run, facts).await,
            Law::Package(v) => v.ensure(dry_run, facts).await,
            Law::PackageRepo(v) => v.ensure(dry_run, facts).await,
            Law::FileTemplate(v) => v.ensure(dry_run, facts).await,
            Law::FileInsert(v) => v.ensure(dry_run, facts).await,
            Law::FileChange(v) => v.ensure(dry_run, facts).await,
            Law::FileLink(v) => v.ensure(dry_run, facts).await,
            Law::Mount(v) => v.ensure(dry_run, facts).await,
            Law::Service(v) => v.ensure(dry_run, facts).await,
            Law::Script(v) => v.ensure(dry_run, facts).await,
            Law::Container(v) => v.ensure(dry_run, facts).await,
            Law::SshKey(v) => v.ensure(dry_run, facts).await,
        }
    }
}

/// One law vertex: its `(group, type, name)` identity plus the owned law
/// value. `group`/`type` are fixed per bucket (see `LawSet::vertices`), so
/// they're attached here rather than duplicated on every law struct.
pub struct LawVertex {
    pub group: &'static str,
    pub type_: &'static str,
    pub name: String,
    pub law: Law,
}

impl LawVertex {
    /// The lowercased `group::type::name` token other laws reference in
    /// `before`/`after` (spec §3, §4.D).
    pub fn token(&self) -> String {
        format!("{}::{}::{}", self.group, self.type_, self.name.to_lowercase())
    }
}

/// A fully decoded, merged set of laws, grouped the way the YAML schema
/// groups them (spec §6). Lists are appended across files in iteration
/// order by the decoder (`decode.rs`); nothing here re-sorts them.
#[derive(Clone, Debug, Default)]
pub struct LawSet {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub packages: Vec<Package>,
    pub package_repos: Vec<PackageRepo>,
    pub containers: Vec<Container>,
    pub scripts: Vec<Script>,
    pub file_templates: Vec<FileTemplate>,
    pub file_inserts: Vec<FileInsert>,
    pub file_changes: Vec<FileChange>,
    pub file_links: Vec<FileLink>,
    pub mounts_present: Vec<Mount>,
    pub mounts_absent: Vec<Mount>,
    pub services: Vec<Service>,
    pub ssh_keys: Vec<SshKey>,
}

impl LawSet {
    pub fn is_empty(&self) -> bool {
        self.vertices().is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices().len()
    }

    /// Explicit enumeration of every vertex, one arm per group/type bucket
    /// — the "graph construction by reflection" redesign flag's prescribed
    /// replacement for the source's struct-walking reflection.
    pub fn vertices(&self) -> Vec<LawVertex> {
        let mut out = Vec::new();
        for v in &self.users {
            out.push(LawVertex { group: "users", type_: "present", name: v.name.clone(), law: Law::User(v.clone()) });
        }
        for v in &self.groups {
            out.push(LawVertex { group: "groups", type_: "present", name: v.name.clone(), law: Law::Group(v.clone()) });
        }
        for v in &self.packages {
            out.push(LawVertex { group: "packages", type_: "installed", name: v.name.clone(), law: Law::Package(v.clone()) });
        }
        for v in &self.package_repos {
            out.push(LawVertex { group: "package_repos", type_: "present", name: v.name.clone(), law: Law::PackageRepo(v.clone()) });
        }
        for v in &self.containers {
            out.push(LawVertex { group: "containers", type_: "running", name: v.name.clone(), law: Law::Container(v.clone()) });
        }
        for v in &self.scripts {
            out.push(LawVertex { group: "scripts", type_: "run", name: v.name.clone(), law: Law::Script(v.clone()) });
        }
        for v in &self.file_templates {
            out.push(LawVertex { group: "files", type_: "templates", name: v.name.clone(), law: Law::FileTemplate(v.clone()) });
        }
        for v in &self.file_inserts {
            out.push(LawVertex { group: "files", type_: "inserts", name: v.name.clone(), law: Law::FileInsert(v.clone()) });
        }
        for v in &self.file_changes {
            out.push(LawVertex { group: "files", type_: "changes", name: v.name.clone(), law: Law::FileChange(v.clone()) });
        }
        for v in &self.file_links {
            out.push(LawVertex { group: "files", type_: "links", name: v.name.clone(), law: Law::FileLink(v.clone()) });
        }
        for v in &self.mounts_present {
            out.push(LawVertex { group: "mounts", type_: "exists", name: v.spec.clone(), law: Law::Mount(v.clone()) });
        }
        for v in &self.mounts_absent {
            out.push(LawVertex { group: "mounts", type_: "absent", name: v.spec.clone(), law: Law::Mount(v.clone()) });
        }
        for v in &self.services {
            out.push(LawVertex { group: "services", type_: "enabled", name: v.name.clone(), law: Law::Service(v.clone()) });
        }
        for v in &self.ssh_keys {
            out.push(LawVertex { group: "ssh", type_: "authorized_keys", name: v.user.clone(), law: Law::SshKey(v.clone()) });
        }
        out
    }
}
