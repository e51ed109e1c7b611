use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{AgentId, ContestId, SubmissionId, TransactionId, UserId};
use crate::state::{ContestState, ContestStatus, FillRate};

/// A buyer-posted task with a funded bounty and deadline.
///
/// The lifecycle lives in [`ContestState`]; serialization flattens it into
/// the row columns the datastore stores (`status`, `fill_rate`,
/// `next_submission_at`, `winner_submission_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContestRow", into = "ContestRow")]
pub struct Contest {
    pub id: ContestId,
    pub buyer_id: UserId,
    pub title: String,
    pub category: String,
    pub objective: String,
    pub constraints: String,
    pub evaluation_criteria: String,
    pub deliverable_format: String,
    pub bounty_amount: f64,
    pub bounty_currency: String,
    pub deadline: DateTime<Utc>,
    pub max_submissions: u32,
    pub min_reputation: u32,
    pub state: ContestState,
    pub synthetic: bool,
}

impl Contest {
    pub fn status(&self) -> ContestStatus {
        self.state.status()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// Flat wire representation of a contest row.
#[derive(Serialize, Deserialize)]
struct ContestRow {
    id: ContestId,
    buyer_id: UserId,
    title: String,
    category: String,
    objective: String,
    constraints: String,
    evaluation_criteria: String,
    deliverable_format: String,
    bounty_amount: f64,
    bounty_currency: String,
    deadline: DateTime<Utc>,
    max_submissions: u32,
    #[serde(default)]
    min_reputation: u32,
    status: ContestStatus,
    #[serde(default)]
    fill_rate: Option<FillRate>,
    #[serde(default)]
    next_submission_at: Option<DateTime<Utc>>,
    #[serde(default)]
    winner_submission_id: Option<SubmissionId>,
    #[serde(default)]
    synthetic: bool,
}

impl From<ContestRow> for Contest {
    fn from(row: ContestRow) -> Self {
        Contest {
            id: row.id,
            buyer_id: row.buyer_id,
            title: row.title,
            category: row.category,
            objective: row.objective,
            constraints: row.constraints,
            evaluation_criteria: row.evaluation_criteria,
            deliverable_format: row.deliverable_format,
            bounty_amount: row.bounty_amount,
            bounty_currency: row.bounty_currency,
            deadline: row.deadline,
            max_submissions: row.max_submissions,
            min_reputation: row.min_reputation,
            state: ContestState::from_columns(
                row.status,
                row.fill_rate,
                row.next_submission_at,
                row.winner_submission_id,
            ),
            synthetic: row.synthetic,
        }
    }
}

impl From<Contest> for ContestRow {
    fn from(contest: Contest) -> Self {
        let (status, fill_rate, next_submission_at, winner_submission_id) =
            contest.state.to_columns();
        ContestRow {
            id: contest.id,
            buyer_id: contest.buyer_id,
            title: contest.title,
            category: contest.category,
            objective: contest.objective,
            constraints: contest.constraints,
            evaluation_criteria: contest.evaluation_criteria,
            deliverable_format: contest.deliverable_format,
            bounty_amount: contest.bounty_amount,
            bounty_currency: contest.bounty_currency,
            deadline: contest.deadline,
            max_submissions: contest.max_submissions,
            min_reputation: contest.min_reputation,
            status,
            fill_rate,
            next_submission_at,
            winner_submission_id,
            synthetic: contest.synthetic,
        }
    }
}

/// An AI agent competing in contests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub owner_id: UserId,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub api_key: String,
    pub contests_entered: u32,
    pub contests_won: u32,
    pub total_earnings: f64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub is_active: bool,
    pub synthetic: bool,
}

impl Agent {
    pub fn covers_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// An agent's entry into a contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub contest_id: ContestId,
    pub agent_id: AgentId,
    pub preview_url: String,
    pub description: String,
    pub is_winner: bool,
    pub is_revision: bool,
    #[serde(default)]
    pub rating: Option<u8>,
    pub synthetic: bool,
}

/// A wallet-holding account; agents are owned by users and payouts
/// resolve to the owning user's wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub wallet_address: String,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    WinnerPayout,
    EscrowDeposit,
    EscrowRefund,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxType::WinnerPayout => "winner_payout",
            TxType::EscrowDeposit => "escrow_deposit",
            TxType::EscrowRefund => "escrow_refund",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

/// Payout record written when a contest closes with a winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
    pub currency: String,
    pub tx_type: TxType,
    pub contest_id: ContestId,
    pub status: TxStatus,
    pub tx_hash: String,
    pub synthetic: bool,
}
