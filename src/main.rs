//! `govern` — local law pipeline and mesh control CLI (spec §6).
//!
//! `govern local ...` renders, decodes, schedules, and (optionally) applies
//! a law set against the current host. `govern mesh ...` either starts a
//! consensus replica or talks to one over HTTP.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use govern_core::{CommandResult, CommandType, MeshStatus, Node, ReplicaId, ShardId};
use govern_mesh::{MeshClient, MeshConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "govern", version, about = "Declarative desired-state configuration and cluster coordination")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (stacks: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Operate on the local host's law set
    Local {
        #[command(subcommand)]
        action: LocalCommand,
    },
    /// Start or talk to a mesh replica
    Mesh {
        #[command(subcommand)]
        action: MeshCommand,
    },
}

#[derive(Subcommand)]
enum LocalCommand {
    /// Print the local facts snapshot as an aligned key/value table
    Facts,
    /// Parse and schedule laws; exit non-zero on any parse or cycle error
    Lint {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        directory: Option<PathBuf>,
    },
    /// Parse, schedule, and run every driver with dry_run=true
    Pretend {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        directory: Option<PathBuf>,
    },
    /// Parse, schedule, and apply every driver for real
    Apply {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        directory: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MeshCommand {
    /// Start a consensus replica and its two HTTP servers; blocks until
    /// SIGINT/SIGTERM
    Start {
        #[arg(long)]
        replica_id: u64,
        #[arg(long)]
        raft_address: String,
        #[arg(long)]
        http_address: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// `id=addr,id=addr,...`
        #[arg(long)]
        initial_members: Option<String>,
        #[arg(long, default_value_t = false)]
        join: bool,
        /// Root directory `apply_laws` commands resolve law file paths against
        #[arg(long, default_value = ".")]
        laws_dir: PathBuf,
    },
    /// GET /status on a peer
    Status {
        #[arg(long)]
        node: String,
    },
    /// GET /nodes on a peer
    Nodes {
        #[arg(long)]
        node: String,
    },
    /// POST /command (or /broadcast) with an `exec` payload
    Exec {
        #[arg(long)]
        node: String,
        #[arg(long)]
        command: String,
        #[arg(long)]
        args: Vec<String>,
        /// `K=V`, may be repeated
        #[arg(long = "env")]
        env: Vec<String>,
        #[arg(long)]
        workdir: Option<String>,
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// Dispatch via /broadcast instead of /command
        #[arg(long, default_value_t = false)]
        broadcast: bool,
    },
    /// POST /command (or /broadcast) with a `facts` payload
    Facts {
        #[arg(long)]
        node: String,
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// Dispatch via /broadcast instead of /command
        #[arg(long, default_value_t = false)]
        broadcast: bool,
    },
    /// POST /command (or /broadcast) with an `apply_laws` payload
    Apply {
        #[arg(long)]
        node: String,
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// Dispatch via /broadcast instead of /command
        #[arg(long, default_value_t = false)]
        broadcast: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "govern=info,tower_http=warn",
        1 => "govern=debug,tower_http=info",
        _ => "govern=trace,tower_http=debug",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Local { action } => run_local(action).await,
        Commands::Mesh { action } => run_mesh_command(action).await,
    };

    if let Err(e) = result {
        eprintln!("govern: {e}");
        std::process::exit(1);
    }
}

fn law_path(file: Option<PathBuf>, directory: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match (file, directory) {
        (Some(f), None) => Ok(f),
        (None, Some(d)) => Ok(d),
        (None, None) => anyhow::bail!("one of --file or --directory is required"),
        (Some(_), Some(_)) => anyhow::bail!("--file and --directory are mutually exclusive"),
    }
}

async fn run_local(action: LocalCommand) -> anyhow::Result<()> {
    match action {
        LocalCommand::Facts => {
            let facts = govern_facts::Facts::collect();
            let rows = facts.as_table_rows();
            let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in rows {
                println!("{key:width$}  {value}");
            }
            Ok(())
        }
        LocalCommand::Lint { file, directory } => {
            let path = law_path(file, directory)?;
            let facts = govern_facts::Facts::collect();
            let count = govern_laws::load_and_lint(&path, &facts)?;
            println!("ok: {count} vertices scheduled");
            Ok(())
        }
        LocalCommand::Pretend { file, directory } => run_apply(file, directory, true).await,
        LocalCommand::Apply { file, directory } => run_apply(file, directory, false).await,
    }
}

async fn run_apply(file: Option<PathBuf>, directory: Option<PathBuf>, dry_run: bool) -> anyhow::Result<()> {
    let path = law_path(file, directory)?;
    let facts = govern_facts::Facts::collect();
    let report = govern_laws::load_and_apply(&path, &facts, dry_run).await?;

    for (token, change) in &report.applied {
        println!("applied  {token}: {change:?}");
    }
    for (token, reason) in &report.skipped {
        println!("skipped  {token}: {reason}");
    }
    for (token, error) in &report.failed {
        println!("failed   {token}: {error}");
    }

    if report.has_failures() {
        anyhow::bail!("{} vertex(es) failed", report.failed.len());
    }
    Ok(())
}

async fn run_mesh_command(action: MeshCommand) -> anyhow::Result<()> {
    match action {
        MeshCommand::Start { replica_id, raft_address, http_address, data_dir, initial_members, join, laws_dir } => {
            mesh_start(replica_id, raft_address, http_address, data_dir, initial_members, join, laws_dir).await
        }
        MeshCommand::Status { node } => {
            let status = MeshClient::new(node).status().await?;
            print_status(&status);
            Ok(())
        }
        MeshCommand::Nodes { node } => {
            let nodes = MeshClient::new(node).nodes().await?;
            print_nodes(&nodes);
            Ok(())
        }
        MeshCommand::Exec { node, command, args, env, workdir, timeout, broadcast } => {
            let env_map = parse_env(&env)?;
            let payload = govern_core::ExecPayload { command, args, env: env_map, work_dir: workdir };
            dispatch(&node, CommandType::Exec, payload, Duration::from_secs(timeout), broadcast).await
        }
        MeshCommand::Facts { node, categories, timeout, broadcast } => {
            let payload = govern_core::FactsPayload { categories };
            dispatch(&node, CommandType::Facts, payload, Duration::from_secs(timeout), broadcast).await
        }
        MeshCommand::Apply { node, files, dry_run, timeout, broadcast } => {
            let payload = govern_core::ApplyLawsPayload { law_files: files, dry_run };
            dispatch(&node, CommandType::ApplyLaws, payload, Duration::from_secs(timeout), broadcast).await
        }
    }
}

/// Shared tail for the three command-dispatching mesh subcommands: hit
/// `/broadcast` or `/command` depending on `--broadcast` and print
/// whichever shape comes back.
async fn dispatch(
    node: &str,
    kind: CommandType,
    payload: impl serde::Serialize,
    timeout: Duration,
    broadcast: bool,
) -> anyhow::Result<()> {
    let client = MeshClient::new(node);
    let value = serde_json::to_value(payload)?;
    if broadcast {
        let results = client.broadcast(kind, value, timeout).await?;
        print_results(&results)
    } else {
        let result = client.dispatch(kind, value, timeout).await?;
        print_result(&result)
    }
}

async fn mesh_start(
    replica_id: u64,
    raft_address: String,
    http_address: String,
    data_dir: Option<PathBuf>,
    initial_members: Option<String>,
    join: bool,
    laws_dir: PathBuf,
) -> anyhow::Result<()> {
    if replica_id == 0 {
        anyhow::bail!("--replica-id must be greater than zero");
    }

    let config = MeshConfig {
        replica_id: ReplicaId::new(replica_id),
        shard_id: ShardId::default(),
        raft_address,
        http_address,
        data_dir: data_dir.unwrap_or_else(MeshConfig::default_data_dir),
        initial_members: parse_members(initial_members.as_deref())?,
        join,
        ..MeshConfig::default()
    };
    config.validate()?;

    let shutdown = tokio_util::sync::CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    govern_mesh::run_mesh(config, laws_dir, shutdown).await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn parse_members(raw: Option<&str>) -> anyhow::Result<BTreeMap<u64, String>> {
    let mut members = BTreeMap::new();
    let Some(raw) = raw else { return Ok(members) };
    for entry in raw.split(',').filter(|s| !s.is_empty()) {
        let (id, addr) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("malformed --initial-members entry: {entry:?} (expected id=addr)"))?;
        let id: u64 = id.parse().map_err(|_| anyhow::anyhow!("malformed replica id in {entry:?}"))?;
        members.insert(id, addr.to_string());
    }
    Ok(members)
}

fn parse_env(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut env = HashMap::new();
    for entry in raw {
        let (k, v) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("malformed --env entry: {entry:?} (expected K=V)"))?;
        env.insert(k.to_string(), v.to_string());
    }
    Ok(env)
}

fn print_status(status: &MeshStatus) {
    println!("node_id:   {}", status.node_id);
    println!("shard_id:  {}", status.shard_id);
    println!("is_leader: {}", status.is_leader);
    print_nodes(&status.nodes);
}

fn print_nodes(nodes: &[Node]) {
    for node in nodes {
        println!("{:<4} {:<22} {:?}", node.id, node.address, node.status);
    }
}

fn print_result(result: &CommandResult) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if !result.success {
        anyhow::bail!("command {} failed: {}", result.id, result.error);
    }
    Ok(())
}

fn print_results(results: &HashMap<String, CommandResult>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(results)?);
    let failed: Vec<&str> = results.iter().filter(|(_, r)| !r.success).map(|(id, _)| id.as_str()).collect();
    if !failed.is_empty() {
        anyhow::bail!("command failed on replica(s): {}", failed.join(", "));
    }
    Ok(())
}
