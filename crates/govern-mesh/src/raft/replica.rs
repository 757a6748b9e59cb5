//! Minimal single-shard, single-leader replicated log (spec §4.G).
//!
//! `original_source/cmd/mesh-start.go` embeds `dragonboat`, a full
//! multi-group Raft library. `SPEC_FULL.md` §3 records the decision to
//! author a minimal leader-election + log-replication protocol directly
//! over the teacher's own `tokio`/`axum`/`reqwest` stack instead of
//! depending on an unverifiable Raft crate — this module is that
//! protocol. It satisfies every contract point in spec §4.G and the
//! ordering guarantees in §5, at the cost of the production hardening
//! (log-matching backtrack on conflict, pre-vote, leadership transfer)
//! a battle-tested Raft library would add; see `DESIGN.md`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use govern_core::{Command, CommandResult};
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MeshConfig;
use crate::error::ConsensusError;
use crate::raft::rpc::{
    AppendEntriesRequest, AppendEntriesResponse, JoinRequest, JoinResponse, RequestVoteRequest,
    RequestVoteResponse,
};
use crate::state_machine::CommandStateMachine;
use crate::wal::{LogEntry, Wal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

struct ReplicaState {
    role: Role,
    current_term: u64,
    voted_for: Option<u64>,
    log: Vec<LogEntry>,
    commit_index: u64,
    membership: BTreeMap<u64, String>,
    leader_id: Option<u64>,
    last_heartbeat: Instant,
}

impl ReplicaState {
    fn last_log_index_term(&self) -> (u64, u64) {
        match self.log.last() {
            Some(entry) => (entry.index, entry.term),
            None => (0, 0),
        }
    }
}

/// A joined cluster member (spec §3 "Cluster membership").
#[derive(Clone, Debug)]
pub struct MembershipEntry {
    pub replica_id: u64,
    pub address: String,
    pub is_leader: bool,
}

pub struct ConsensusReplica {
    config: MeshConfig,
    state: RwLock<ReplicaState>,
    state_machine: Mutex<CommandStateMachine>,
    wal: Wal,
    http: reqwest::Client,
    cancel: CancellationToken,
    next_log_index: AtomicU64,
}

impl ConsensusReplica {
    /// Bootstrap or join a shard, open persisted state under
    /// `config.node_dir()`, and spawn the election-timer, heartbeat, and
    /// periodic status-worker background tasks.
    pub async fn start(config: MeshConfig) -> Result<Arc<Self>, ConsensusError> {
        config.validate()?;

        let wal = Wal::open(&config.node_dir())?;
        let mut state_machine = CommandStateMachine::new();
        wal.read_snapshot(&mut state_machine)?;
        let log = wal.replay()?;
        for entry in &log {
            state_machine.update(entry.command.clone());
        }
        let next_index = log.last().map(|e| e.index + 1).unwrap_or(1);

        let mut membership = config.initial_members.clone();
        membership.insert(config.replica_id.get(), config.raft_address.clone());

        let replica = Arc::new(Self {
            config: config.clone(),
            state: RwLock::new(ReplicaState {
                role: Role::Follower,
                current_term: 0,
                voted_for: None,
                log,
                commit_index: 0,
                membership,
                leader_id: None,
                last_heartbeat: Instant::now(),
            }),
            state_machine: Mutex::new(state_machine),
            wal,
            http: reqwest::Client::new(),
            cancel: CancellationToken::new(),
            next_log_index: AtomicU64::new(next_index),
        });

        if config.join {
            replica.join_cluster().await?;
        }

        replica.clone().spawn_election_timer();
        replica.clone().spawn_status_worker();

        Ok(replica)
    }

    pub fn replica_id(&self) -> u64 {
        self.config.replica_id.get()
    }

    pub fn shard_id(&self) -> u64 {
        self.config.shard_id.0
    }

    pub async fn is_leader(&self) -> bool {
        self.state.read().await.role == Role::Leader
    }

    /// `(leader_id, term, valid)` — `valid` is false when no leader has
    /// been observed yet (spec §4.G `get_leader`).
    pub async fn get_leader(&self) -> (u64, u64, bool) {
        let state = self.state.read().await;
        match state.leader_id {
            Some(id) => (id, state.current_term, true),
            None => (0, state.current_term, false),
        }
    }

    pub async fn get_membership(&self) -> Vec<MembershipEntry> {
        let state = self.state.read().await;
        state
            .membership
            .iter()
            .map(|(&id, addr)| MembershipEntry {
                replica_id: id,
                address: addr.clone(),
                is_leader: state.leader_id == Some(id),
            })
            .collect()
    }

    /// Append `command` to the leader's log, replicate it to a majority,
    /// and apply it to the local state machine once committed. Used by
    /// both `/command` and `/broadcast` (spec §9 Open Question (c); see
    /// `DESIGN.md` for why both route through the log).
    pub async fn propose(&self, command: Command, timeout: Duration) -> Result<(), ConsensusError> {
        let deadline = Instant::now() + timeout;

        let (entry, members, term) = {
            let mut state = self.state.write().await;
            if state.role != Role::Leader {
                return Err(ConsensusError::NotLeader(self.replica_id()));
            }
            let index = self.next_log_index.fetch_add(1, Ordering::SeqCst);
            let entry = LogEntry { index, term: state.current_term, command };
            state.log.push(entry.clone());
            (entry, state.membership.clone(), state.current_term)
        };

        self.wal.append(&entry)?;

        let peers: Vec<(u64, String)> = members
            .into_iter()
            .filter(|(id, _)| *id != self.replica_id())
            .collect();
        let majority = peers.len() / 2 + 1; // +1 for self, so `acks >= majority` of `peers.len()+1`.

        let mut acks = 1usize; // leader counts itself.
        type AckFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, ConsensusError>> + Send + 'a>>;
        let mut pending: Vec<AckFuture<'_>> = peers
            .into_iter()
            .map(|(_, addr)| Box::pin(self.send_append_entries(addr, term, entry.clone(), deadline)) as AckFuture<'_>)
            .collect();

        while !pending.is_empty() && acks < majority && Instant::now() < deadline {
            let (result, _, rest) = futures::future::select_all(pending).await;
            pending = rest;
            if matches!(result, Ok(true)) {
                acks += 1;
            }
        }

        if acks < majority {
            return Err(ConsensusError::ReplicationFailed(majority));
        }

        {
            let mut state = self.state.write().await;
            state.commit_index = entry.index;
        }
        self.state_machine.lock().await.update(entry.command);
        self.maybe_compact().await;
        Ok(())
    }

    async fn send_append_entries(
        &self,
        peer_addr: String,
        term: u64,
        entry: LogEntry,
        deadline: Instant,
    ) -> Result<bool, ConsensusError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let membership = self.state.read().await.membership.clone();
        let body = AppendEntriesRequest {
            term,
            leader_id: self.replica_id(),
            prev_log_index: entry.index.saturating_sub(1),
            prev_log_term: term,
            leader_commit: entry.index,
            entries: vec![entry],
            membership,
        };
        let url = format!("http://{peer_addr}/raft/append_entries");
        let resp = tokio::time::timeout(remaining, self.http.post(&url).json(&body).send()).await;
        match resp {
            Ok(Ok(r)) => match r.json::<AppendEntriesResponse>().await {
                Ok(parsed) => Ok(parsed.success),
                Err(_) => Ok(false),
            },
            _ => Ok(false),
        }
    }

    /// Execute one StateMachine lookup — used by the control API and by
    /// any future diagnostics surface.
    pub async fn lookup(&self, query: &crate::state_machine::LookupQuery) -> crate::state_machine::LookupResult {
        self.state_machine.lock().await.lookup(query)
    }

    /// Local-only: records a command's execution result without going
    /// through the log (spec §4.H `StoreResult`).
    pub async fn store_result(&self, result: CommandResult) {
        self.state_machine.lock().await.store_result(result);
    }

    pub async fn command_count(&self) -> usize {
        self.state_machine.lock().await.command_count()
    }

    /// Snapshot and compact the log once it has grown past
    /// `config.snapshot_entries` since the last snapshot, retaining the
    /// trailing `config.compaction_overhead` entries (spec §4.G). Called
    /// after every commit-index advance; a no-op when the log is still
    /// short enough that the cost of a snapshot isn't worth paying yet.
    async fn maybe_compact(&self) {
        let grown_enough = {
            let state = self.state.read().await;
            state.log.len() as u64 > self.config.snapshot_entries
        };
        if !grown_enough {
            return;
        }

        let sm = self.state_machine.lock().await;
        if let Err(e) = self.wal.write_snapshot(&sm) {
            warn!(error = %e, "failed to write snapshot during compaction");
            return;
        }
        drop(sm);

        let mut state = self.state.write().await;
        let commit_index = state.commit_index;
        match self.wal.compact(&state.log, commit_index, self.config.compaction_overhead) {
            Ok(retained) => state.log = retained,
            Err(e) => warn!(error = %e, "failed to compact log"),
        }
    }

    // ---- raft RPC handlers (called from the internal raft HTTP server) ----

    pub async fn handle_request_vote(&self, req: RequestVoteRequest) -> RequestVoteResponse {
        let mut state = self.state.write().await;
        if req.term < state.current_term {
            return RequestVoteResponse { term: state.current_term, vote_granted: false };
        }
        if req.term > state.current_term {
            state.current_term = req.term;
            state.voted_for = None;
            state.role = Role::Follower;
        }

        let (last_index, last_term) = state.last_log_index_term();
        let log_ok = req.last_log_term > last_term
            || (req.last_log_term == last_term && req.last_log_index >= last_index);

        let can_vote = state.voted_for.is_none() || state.voted_for == Some(req.candidate_id);
        let grant = log_ok && can_vote;
        if grant {
            state.voted_for = Some(req.candidate_id);
            state.last_heartbeat = Instant::now();
        }
        RequestVoteResponse { term: state.current_term, vote_granted: grant }
    }

    pub async fn handle_append_entries(&self, req: AppendEntriesRequest) -> AppendEntriesResponse {
        let mut state = self.state.write().await;
        if req.term < state.current_term {
            return AppendEntriesResponse { term: state.current_term, success: false, match_index: 0 };
        }

        state.current_term = req.term;
        state.role = Role::Follower;
        state.leader_id = Some(req.leader_id);
        state.last_heartbeat = Instant::now();
        for (id, addr) in req.membership {
            state.membership.entry(id).or_insert(addr);
        }

        for entry in &req.entries {
            if !state.log.iter().any(|e| e.index == entry.index) {
                state.log.push(entry.clone());
                if let Err(e) = self.wal.append(entry) {
                    warn!(error = %e, "failed to persist replicated entry");
                }
            }
        }

        let new_commit = req.leader_commit.min(state.log.last().map(|e| e.index).unwrap_or(0));
        let grew = new_commit > state.commit_index;
        let to_apply: Vec<Command> = if grew {
            let entries = state
                .log
                .iter()
                .filter(|e| e.index > state.commit_index && e.index <= new_commit)
                .map(|e| e.command.clone())
                .collect();
            state.commit_index = new_commit;
            entries
        } else {
            Vec::new()
        };
        drop(state);

        if grew {
            let mut sm = self.state_machine.lock().await;
            for command in to_apply {
                sm.update(command);
            }
            drop(sm);
            self.maybe_compact().await;
        }

        AppendEntriesResponse { term: req.term, success: true, match_index: new_commit }
    }

    pub async fn handle_join(&self, req: JoinRequest) -> JoinResponse {
        let mut state = self.state.write().await;
        if state.role != Role::Leader {
            let hint = state.leader_id.and_then(|id| state.membership.get(&id).cloned());
            return JoinResponse { ok: false, leader_hint: hint, membership: state.membership.clone() };
        }
        state.membership.insert(req.replica_id, req.raft_address);
        JoinResponse { ok: true, leader_hint: None, membership: state.membership.clone() }
    }

    // ---- background tasks ----

    async fn join_cluster(&self) -> Result<(), ConsensusError> {
        let mut target = self
            .config
            .initial_members
            .values()
            .next()
            .cloned()
            .ok_or(ConsensusError::JoinWithoutPeers)?;

        let req = JoinRequest { replica_id: self.replica_id(), raft_address: self.config.raft_address.clone() };

        for _ in 0..5 {
            let url = format!("http://{target}/raft/join");
            let resp = self.http.post(&url).json(&req).send().await;
            match resp {
                Ok(r) => match r.json::<JoinResponse>().await {
                    Ok(parsed) if parsed.ok => {
                        let mut state = self.state.write().await;
                        state.membership = parsed.membership;
                        info!(leader = %target, "joined existing shard");
                        return Ok(());
                    }
                    Ok(parsed) => {
                        if let Some(hint) = parsed.leader_hint {
                            target = hint;
                            continue;
                        }
                        return Err(ConsensusError::Election("join target is not the leader and gave no hint".into()));
                    }
                    Err(e) => return Err(ConsensusError::Election(e.to_string())),
                },
                Err(e) => return Err(ConsensusError::Election(e.to_string())),
            }
        }
        Err(ConsensusError::Election("exceeded join redirect retries".into()))
    }

    fn spawn_election_timer(self: Arc<Self>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let base = self.config.election_timeout();
                let jitter_ms = rand::thread_rng().gen_range(0..base.as_millis() as u64);
                let wait = base + Duration::from_millis(jitter_ms);

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(wait) => {}
                }

                let should_elect = {
                    let state = self.state.read().await;
                    state.role != Role::Leader && state.last_heartbeat.elapsed() >= base
                };
                if should_elect {
                    self.run_election().await;
                }
            }
        });
    }

    async fn run_election(self: &Arc<Self>) {
        let (term, members, last_index, last_term) = {
            let mut state = self.state.write().await;
            state.role = Role::Candidate;
            state.current_term += 1;
            state.voted_for = Some(self.replica_id());
            state.last_heartbeat = Instant::now();
            let (li, lt) = state.last_log_index_term();
            (state.current_term, state.membership.clone(), li, lt)
        };

        let peers: Vec<String> = members
            .into_iter()
            .filter(|(id, _)| *id != self.replica_id())
            .map(|(_, addr)| addr)
            .collect();
        let majority = peers.len() / 2 + 1;
        let mut votes = 1usize; // self-vote.

        let req = RequestVoteRequest { term, candidate_id: self.replica_id(), last_log_index: last_index, last_log_term: last_term };
        let futures: Vec<_> = peers
            .into_iter()
            .map(|addr| {
                let http = self.http.clone();
                let req = req.clone();
                async move {
                    let url = format!("http://{addr}/raft/vote");
                    let resp = tokio::time::timeout(Duration::from_millis(500), http.post(&url).json(&req).send()).await;
                    match resp {
                        Ok(Ok(r)) => r.json::<RequestVoteResponse>().await.ok(),
                        _ => None,
                    }
                }
            })
            .collect();

        for result in futures::future::join_all(futures).await {
            if let Some(vote) = result {
                if vote.vote_granted {
                    votes += 1;
                }
            }
        }

        if votes >= majority {
            let mut state = self.state.write().await;
            if state.current_term == term {
                state.role = Role::Leader;
                state.leader_id = Some(self.replica_id());
                info!(term, votes, "won election, becoming leader");
                drop(state);
                Arc::clone(self).spawn_heartbeat();
            }
        } else {
            debug!(term, votes, majority, "election lost, remaining follower");
        }
    }

    fn spawn_heartbeat(self: Arc<Self>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let interval = self.config.heartbeat_interval();
            loop {
                {
                    let state = self.state.read().await;
                    if state.role != Role::Leader {
                        return;
                    }
                }
                let (term, members, leader_commit) = {
                    let state = self.state.read().await;
                    (state.current_term, state.membership.clone(), state.commit_index)
                };
                for (&id, addr) in members.iter() {
                    if id == self.replica_id() {
                        continue;
                    }
                    let http = self.http.clone();
                    let addr = addr.clone();
                    let body = AppendEntriesRequest {
                        term,
                        leader_id: self.replica_id(),
                        prev_log_index: 0,
                        prev_log_term: term,
                        entries: vec![],
                        leader_commit,
                        membership: members.clone(),
                    };
                    tokio::spawn(async move {
                        let url = format!("http://{addr}/raft/append_entries");
                        let _ = tokio::time::timeout(Duration::from_millis(500), http.post(&url).json(&body).send()).await;
                    });
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
    }

    fn spawn_status_worker(self: Arc<Self>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let interval = self.config.status_interval();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                let state = self.state.read().await;
                info!(
                    replica_id = self.replica_id(),
                    role = ?state.role,
                    term = state.current_term,
                    members = state.membership.len(),
                    "mesh status"
                );
            }
        });
    }

    /// Drain in-flight work, persist a snapshot, and stop background
    /// tasks (spec §4.G clean shutdown; §5's 30s grace period is enforced
    /// by the caller via a timeout around this call).
    pub async fn shutdown(&self) -> Result<(), ConsensusError> {
        self.cancel.cancel();
        let sm = self.state_machine.lock().await;
        self.wal.write_snapshot(&sm)?;
        Ok(())
    }
}
