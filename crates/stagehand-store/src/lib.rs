//! Datastore seam for the activity simulator.
//!
//! The engine never talks to a concrete backend; it goes through
//! [`MarketStore`], which exposes exactly the reads and writes the
//! simulation needs. [`memory::MemoryStore`] backs tests and local dry
//! runs, [`rest::RestStore`] talks to the hosted row store over HTTP.

pub mod memory;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagehand_types::{
    Agent, AgentId, Contest, ContestId, Submission, SubmissionId, TransactionRecord, User, UserId,
};

/// Per-table counts of synthetic rows, used by the status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticCounts {
    pub users: usize,
    pub agents: usize,
    pub contests: usize,
    pub submissions: usize,
    pub transactions: usize,
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    // Users
    async fn insert_users(&self, users: Vec<User>) -> Result<()>;
    /// Insert, or overwrite the row with the same wallet address.
    async fn upsert_user_by_wallet(&self, user: User) -> Result<()>;
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn user_by_wallet(&self, wallet: &str) -> Result<Option<User>>;

    // Agents
    async fn insert_agents(&self, agents: Vec<Agent>) -> Result<()>;
    async fn synthetic_agents(&self) -> Result<Vec<Agent>>;
    /// Winner bookkeeping: bump `contests_won` and add the bounty to
    /// `total_earnings`.
    async fn record_agent_win(&self, id: AgentId, bounty: f64) -> Result<()>;

    // Contests
    async fn insert_contest(&self, contest: Contest) -> Result<()>;
    async fn open_synthetic_contests(&self) -> Result<Vec<Contest>>;
    /// Most recently deadlined synthetic contests, newest first.
    async fn recent_synthetic_contests(&self, limit: usize) -> Result<Vec<Contest>>;
    /// Reschedule the pacing clock of an open contest. A no-op on a
    /// contest that is no longer open.
    async fn set_next_submission_at(&self, id: ContestId, at: DateTime<Utc>) -> Result<()>;
    /// Transition a contest to completed, recording the winning
    /// submission when there is one.
    async fn complete_contest(&self, id: ContestId, winner: Option<SubmissionId>) -> Result<()>;

    // Submissions
    async fn insert_submission(&self, submission: Submission) -> Result<()>;
    async fn submissions_for_contest(&self, id: ContestId) -> Result<Vec<Submission>>;
    async fn submission_count(&self, id: ContestId) -> Result<u32>;
    async fn mark_winner(&self, id: SubmissionId, rating: u8) -> Result<()>;

    // Transactions
    async fn insert_transaction(&self, tx: TransactionRecord) -> Result<()>;
    async fn transactions_for_contest(&self, id: ContestId) -> Result<Vec<TransactionRecord>>;

    // Reporting and cleanup
    async fn synthetic_counts(&self) -> Result<SyntheticCounts>;
    /// Delete every synthetic row, children before parents so foreign
    /// keys never dangle. Returns how many rows each table lost.
    async fn clear_synthetic(&self) -> Result<SyntheticCounts>;
}
