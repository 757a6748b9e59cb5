//! YAML law decoding and multi-file merge (spec §4.C).
//!
//! `original_source/pkg/laws/parser.go` walks a directory, templates and
//! unmarshals each file into a `Laws3` value, then folds it into an
//! accumulator with `mergo.Merge(laws, loopLaws, mergo.WithAppendSlice)` —
//! append-only merge semantics, never overwrite. The per-variant structs
//! already carry `#[serde(default)]` plus explicit `Default` impls (see
//! `model.rs`), which gives us "defaults before fields" for free from
//! `serde_yaml`; this module only has to walk files and append the
//! resulting vectors in file order.

use std::path::Path;

use serde::Deserialize;

use crate::error::DecodeError;
use crate::model::{
    Container, FileChange, FileInsert, FileLink, FileTemplate, Group, LawSet, Mount, Package,
    PackageRepo, Script, Service, SshKey, User,
};

/// Mirrors the group/type nesting of the YAML schema (spec §6). Every
/// field is optional in a single document: a file may define only the
/// groups/types it cares about, and merging is append-only across files.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    users: UsersDoc,
    groups: GroupsDoc,
    packages: PackagesDoc,
    package_repos: PackageReposDoc,
    containers: ContainersDoc,
    scripts: ScriptsDoc,
    files: FilesDoc,
    mounts: MountsDoc,
    services: ServicesDoc,
    ssh: SshDoc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsersDoc {
    present: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroupsDoc {
    present: Vec<Group>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackagesDoc {
    installed: Vec<Package>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageReposDoc {
    present: Vec<PackageRepo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainersDoc {
    running: Vec<Container>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScriptsDoc {
    run: Vec<Script>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilesDoc {
    templates: Vec<FileTemplate>,
    inserts: Vec<FileInsert>,
    changes: Vec<FileChange>,
    links: Vec<FileLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MountsDoc {
    exists: Vec<Mount>,
    absent: Vec<Mount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServicesDoc {
    enabled: Vec<Service>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SshDoc {
    authorized_keys: Vec<SshKey>,
}

/// Decode one rendered YAML document and append its contents onto `laws`.
///
/// `file` is used only for error attribution. Appends happen in document
/// order within each group/type path; no key is ever overwritten, matching
/// the source's `mergo.WithAppendSlice` contract.
pub fn decode_into(file: &str, rendered: &str, laws: &mut LawSet) -> Result<(), DecodeError> {
    let doc: RawDocument = serde_yaml::from_str(rendered)
        .map_err(|e| DecodeError::field(file, "$", e))?;

    laws.users.extend(doc.users.present);
    laws.groups.extend(doc.groups.present);
    laws.packages.extend(doc.packages.installed);
    laws.package_repos.extend(doc.package_repos.present);
    laws.containers.extend(doc.containers.running);
    laws.scripts.extend(doc.scripts.run);
    laws.file_templates.extend(doc.files.templates);
    laws.file_inserts.extend(doc.files.inserts);
    laws.file_changes.extend(doc.files.changes);
    laws.file_links.extend(doc.files.links);
    laws.mounts_present.extend(doc.mounts.exists);
    laws.mounts_absent.extend(doc.mounts.absent);
    laws.services.extend(doc.services.enabled);
    laws.ssh_keys.extend(doc.ssh.authorized_keys);

    validate_identities(file, laws)
}

/// Leaf variants require a non-empty identity; this is a hard decode error
/// rather than a silent drop (spec §4.C: "missing identity ... is either a
/// hard decode error ... or silently dropped if the variant supports
/// optional omission" — none of our variants document optional omission,
/// so all are checked here).
fn validate_identities(file: &str, laws: &LawSet) -> Result<(), DecodeError> {
    let empty = |name: &str, path: &str| DecodeError::field(file, path, format!("{path}: empty name"));
    for v in &laws.users {
        if v.name.is_empty() {
            return Err(empty("user", "users.present[].name"));
        }
    }
    for v in &laws.groups {
        if v.name.is_empty() {
            return Err(empty("group", "groups.present[].name"));
        }
    }
    for v in &laws.packages {
        if v.name.is_empty() {
            return Err(empty("package", "packages.installed[].name"));
        }
    }
    for v in &laws.package_repos {
        if v.name.is_empty() {
            return Err(empty("package_repo", "package_repos.present[].name"));
        }
    }
    for v in &laws.containers {
        if v.name.is_empty() {
            return Err(empty("container", "containers.running[].name"));
        }
    }
    for v in &laws.scripts {
        if v.name.is_empty() {
            return Err(empty("script", "scripts.run[].name"));
        }
    }
    for v in &laws.file_templates {
        if v.name.is_empty() {
            return Err(empty("file_template", "files.templates[].name"));
        }
    }
    for v in &laws.file_inserts {
        if v.name.is_empty() {
            return Err(empty("file_insert", "files.inserts[].name"));
        }
    }
    for v in &laws.file_changes {
        if v.name.is_empty() {
            return Err(empty("file_change", "files.changes[].name"));
        }
    }
    for v in &laws.file_links {
        if v.name.is_empty() {
            return Err(empty("file_link", "files.links[].name"));
        }
    }
    for v in laws.mounts_present.iter().chain(&laws.mounts_absent) {
        if v.spec.is_empty() {
            return Err(empty("mount", "mounts[].spec"));
        }
    }
    for v in &laws.services {
        if v.name.is_empty() {
            return Err(empty("service", "services.enabled[].name"));
        }
    }
    for v in &laws.ssh_keys {
        if v.user.is_empty() {
            return Err(empty("ssh_key", "ssh.authorized_keys[].user"));
        }
    }
    Ok(())
}

/// Render and decode every `.yaml`/`.yml` file under `path` (or the single
/// file at `path`), in filesystem walk order, folding them into one
/// `LawSet`. Mirrors `ParseFiles`'s directory walk.
pub fn load(path: &Path, facts: &govern_facts::Facts) -> Result<LawSet, crate::error::PipelineError> {
    let mut laws = LawSet::default();

    let files: Vec<_> = if path.is_dir() {
        walkdir::WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches!(e.path().extension().and_then(|x| x.to_str()), Some("yaml") | Some("yml")))
            .map(|e| e.path().to_path_buf())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    for file in files {
        let display = file.display().to_string();
        let text = std::fs::read_to_string(&file).map_err(|e| {
            crate::error::PipelineError::Decode(DecodeError::field(&display, "$", e))
        })?;
        let rendered = crate::template::render(&display, &text, facts)
            .map_err(crate::error::PipelineError::Template)?;
        decode_into(&display, &rendered, &mut laws).map_err(crate::error::PipelineError::Decode)?;
    }

    Ok(laws)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_users_and_applies_defaults() {
        let yaml = "users:\n  present:\n    - name: iggy\n";
        let mut laws = LawSet::default();
        decode_into("test.yaml", yaml, &mut laws).unwrap();
        assert_eq!(laws.users.len(), 1);
        assert_eq!(laws.users[0].name, "iggy");
        assert!(!laws.users[0].reconcile_mismatches);
    }

    #[test]
    fn mount_defaults_match_contract() {
        let yaml = "mounts:\n  exists:\n    - spec: /dev/sdb1\n      mount_point: /data\n      type: ext4\n";
        let mut laws = LawSet::default();
        decode_into("test.yaml", yaml, &mut laws).unwrap();
        let mount = &laws.mounts_present[0];
        assert_eq!(mount.options, "defaults");
        assert_eq!(mount.freq, 0);
        assert_eq!(mount.pass, 0);
        assert!(mount.present);
    }

    #[test]
    fn appends_across_two_documents() {
        let mut laws = LawSet::default();
        decode_into("a.yaml", "users:\n  present:\n    - name: root\n", &mut laws).unwrap();
        decode_into("b.yaml", "users:\n  present:\n    - name: iggy\n", &mut laws).unwrap();
        assert_eq!(laws.users.len(), 2);
        assert_eq!(laws.users[0].name, "root");
        assert_eq!(laws.users[1].name, "iggy");
    }

    #[test]
    fn empty_name_is_a_decode_error() {
        let yaml = "users:\n  present:\n    - name: \"\"\n";
        let mut laws = LawSet::default();
        let err = decode_into("test.yaml", yaml, &mut laws).unwrap_err();
        assert!(matches!(err, DecodeError::Field { .. }));
    }
}
