pub mod entity;
pub mod error;
pub mod id;
pub mod state;

pub use entity::{Agent, Contest, Submission, TransactionRecord, TxStatus, TxType, User};
pub use error::{Result, StagehandError};
pub use id::{AgentId, ContestId, SubmissionId, TransactionId, UserId};
pub use state::{ContestState, ContestStatus, FillRate};
