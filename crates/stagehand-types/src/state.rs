use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StagehandError;
use crate::id::SubmissionId;

/// How quickly synthetic submissions accumulate on a contest. Chosen at
/// creation and fixed for the contest's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRate {
    Fast,
    Medium,
    Slow,
}

impl FillRate {
    pub const ALL: [FillRate; 3] = [FillRate::Fast, FillRate::Medium, FillRate::Slow];

    pub fn as_str(&self) -> &'static str {
        match self {
            FillRate::Fast => "fast",
            FillRate::Medium => "medium",
            FillRate::Slow => "slow",
        }
    }
}

impl FromStr for FillRate {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(FillRate::Fast),
            "medium" => Ok(FillRate::Medium),
            "slow" => Ok(FillRate::Slow),
            other => Err(StagehandError::InvalidParameter(format!(
                "unknown fill rate '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FillRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat status column as the datastore sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Open,
    Reviewing,
    Completed,
    Cancelled,
    Refunded,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestStatus::Open => "open",
            ContestStatus::Reviewing => "reviewing",
            ContestStatus::Completed => "completed",
            ContestStatus::Cancelled => "cancelled",
            ContestStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contest lifecycle as a tagged variant. The pacing fields only exist
/// while the contest is open, so reading them on a closed contest is a
/// type error rather than a latent bug.
#[derive(Debug, Clone, PartialEq)]
pub enum ContestState {
    Open {
        fill_rate: FillRate,
        next_submission_at: DateTime<Utc>,
    },
    Reviewing,
    Completed {
        winner: Option<SubmissionId>,
    },
    Cancelled,
    Refunded,
}

impl ContestState {
    pub fn status(&self) -> ContestStatus {
        match self {
            ContestState::Open { .. } => ContestStatus::Open,
            ContestState::Reviewing => ContestStatus::Reviewing,
            ContestState::Completed { .. } => ContestStatus::Completed,
            ContestState::Cancelled => ContestStatus::Cancelled,
            ContestState::Refunded => ContestStatus::Refunded,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ContestState::Open { .. })
    }

    /// Rebuild the variant from flat row columns. An open row with missing
    /// pacing columns gets medium rate and an immediately-due timestamp,
    /// matching how the store treats absent values.
    pub fn from_columns(
        status: ContestStatus,
        fill_rate: Option<FillRate>,
        next_submission_at: Option<DateTime<Utc>>,
        winner: Option<SubmissionId>,
    ) -> Self {
        match status {
            ContestStatus::Open => ContestState::Open {
                fill_rate: fill_rate.unwrap_or(FillRate::Medium),
                next_submission_at: next_submission_at.unwrap_or(DateTime::UNIX_EPOCH),
            },
            ContestStatus::Reviewing => ContestState::Reviewing,
            ContestStatus::Completed => ContestState::Completed { winner },
            ContestStatus::Cancelled => ContestState::Cancelled,
            ContestStatus::Refunded => ContestState::Refunded,
        }
    }

    /// Flatten back into the row columns.
    pub fn to_columns(
        &self,
    ) -> (
        ContestStatus,
        Option<FillRate>,
        Option<DateTime<Utc>>,
        Option<SubmissionId>,
    ) {
        match self {
            ContestState::Open {
                fill_rate,
                next_submission_at,
            } => (
                ContestStatus::Open,
                Some(*fill_rate),
                Some(*next_submission_at),
                None,
            ),
            ContestState::Reviewing => (ContestStatus::Reviewing, None, None, None),
            ContestState::Completed { winner } => (ContestStatus::Completed, None, None, *winner),
            ContestState::Cancelled => (ContestStatus::Cancelled, None, None, None),
            ContestState::Refunded => (ContestStatus::Refunded, None, None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rate_roundtrip() {
        for rate in FillRate::ALL {
            assert_eq!(rate.as_str().parse::<FillRate>().unwrap(), rate);
        }
        assert!("warp".parse::<FillRate>().is_err());
    }

    #[test]
    fn test_open_state_columns() {
        let at = Utc::now();
        let state = ContestState::Open {
            fill_rate: FillRate::Fast,
            next_submission_at: at,
        };
        let (status, rate, next, winner) = state.to_columns();
        assert_eq!(status, ContestStatus::Open);
        assert_eq!(rate, Some(FillRate::Fast));
        assert_eq!(next, Some(at));
        assert!(winner.is_none());

        let rebuilt = ContestState::from_columns(status, rate, next, winner);
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn test_completed_state_drops_pacing() {
        let winner = SubmissionId::generate();
        let state = ContestState::Completed {
            winner: Some(winner),
        };
        let (status, rate, next, row_winner) = state.to_columns();
        assert_eq!(status, ContestStatus::Completed);
        assert!(rate.is_none());
        assert!(next.is_none());
        assert_eq!(row_winner, Some(winner));
    }

    #[test]
    fn test_open_row_with_missing_pacing_defaults() {
        let state = ContestState::from_columns(ContestStatus::Open, None, None, None);
        match state {
            ContestState::Open {
                fill_rate,
                next_submission_at,
            } => {
                assert_eq!(fill_rate, FillRate::Medium);
                assert!(next_submission_at < Utc::now());
            }
            other => panic!("expected open state, got {:?}", other),
        }
    }
}
