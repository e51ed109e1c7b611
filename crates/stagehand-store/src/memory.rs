use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use stagehand_types::{
    Agent, AgentId, Contest, ContestId, ContestState, Submission, SubmissionId, TransactionId,
    TransactionRecord, User, UserId,
};

use crate::{MarketStore, SyntheticCounts};

type Table<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// In-memory backend with the same observable semantics as the REST
/// backend. Used by tests and by `--store memory` dry runs.
pub struct MemoryStore {
    users: Table<UserId, User>,
    agents: Table<AgentId, Agent>,
    contests: Table<ContestId, Contest>,
    submissions: Table<SubmissionId, Submission>,
    transactions: Table<TransactionId, TransactionRecord>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            agents: Arc::new(RwLock::new(HashMap::new())),
            contests: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Direct read used by tests to assert on final contest state.
    pub async fn contest(&self, id: ContestId) -> Option<Contest> {
        self.contests.read().await.get(&id).cloned()
    }

    /// Direct read used by tests to assert on agent counters.
    pub async fn agent(&self, id: AgentId) -> Option<Agent> {
        self.agents.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_users(&self, users: Vec<User>) -> Result<()> {
        let mut table = self.users.write().await;
        for user in users {
            table.insert(user.id, user);
        }
        Ok(())
    }

    async fn upsert_user_by_wallet(&self, user: User) -> Result<()> {
        let mut table = self.users.write().await;
        let existing = table
            .values()
            .find(|u| u.wallet_address == user.wallet_address)
            .map(|u| u.id);
        if let Some(id) = existing {
            table.remove(&id);
        }
        table.insert(user.id, user);
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_wallet(&self, wallet: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.wallet_address == wallet)
            .cloned())
    }

    async fn insert_agents(&self, agents: Vec<Agent>) -> Result<()> {
        let mut table = self.agents.write().await;
        for agent in agents {
            table.insert(agent.id, agent);
        }
        Ok(())
    }

    async fn synthetic_agents(&self) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .read()
            .await
            .values()
            .filter(|a| a.synthetic)
            .cloned()
            .collect())
    }

    async fn record_agent_win(&self, id: AgentId, bounty: f64) -> Result<()> {
        let mut table = self.agents.write().await;
        let agent = table
            .get_mut(&id)
            .ok_or_else(|| anyhow!("agent {} not found", id))?;
        agent.contests_won += 1;
        agent.total_earnings += bounty;
        debug!(
            agent_id = %id,
            contests_won = agent.contests_won,
            total_earnings = agent.total_earnings,
            "Agent win recorded"
        );
        Ok(())
    }

    async fn insert_contest(&self, contest: Contest) -> Result<()> {
        self.contests.write().await.insert(contest.id, contest);
        Ok(())
    }

    async fn open_synthetic_contests(&self) -> Result<Vec<Contest>> {
        Ok(self
            .contests
            .read()
            .await
            .values()
            .filter(|c| c.synthetic && c.state.is_open())
            .cloned()
            .collect())
    }

    async fn recent_synthetic_contests(&self, limit: usize) -> Result<Vec<Contest>> {
        let table = self.contests.read().await;
        let mut contests: Vec<Contest> = table.values().filter(|c| c.synthetic).cloned().collect();
        contests.sort_by(|a, b| b.deadline.cmp(&a.deadline));
        contests.truncate(limit);
        Ok(contests)
    }

    async fn set_next_submission_at(&self, id: ContestId, at: DateTime<Utc>) -> Result<()> {
        let mut table = self.contests.write().await;
        let contest = table
            .get_mut(&id)
            .ok_or_else(|| anyhow!("contest {} not found", id))?;
        if let ContestState::Open { fill_rate, .. } = contest.state {
            contest.state = ContestState::Open {
                fill_rate,
                next_submission_at: at,
            };
        }
        Ok(())
    }

    async fn complete_contest(&self, id: ContestId, winner: Option<SubmissionId>) -> Result<()> {
        let mut table = self.contests.write().await;
        let contest = table
            .get_mut(&id)
            .ok_or_else(|| anyhow!("contest {} not found", id))?;
        contest.state = ContestState::Completed { winner };
        Ok(())
    }

    async fn insert_submission(&self, submission: Submission) -> Result<()> {
        self.submissions
            .write()
            .await
            .insert(submission.id, submission);
        Ok(())
    }

    async fn submissions_for_contest(&self, id: ContestId) -> Result<Vec<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.contest_id == id)
            .cloned()
            .collect())
    }

    async fn submission_count(&self, id: ContestId) -> Result<u32> {
        Ok(self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.contest_id == id)
            .count() as u32)
    }

    async fn mark_winner(&self, id: SubmissionId, rating: u8) -> Result<()> {
        let mut table = self.submissions.write().await;
        let submission = table
            .get_mut(&id)
            .ok_or_else(|| anyhow!("submission {} not found", id))?;
        submission.is_winner = true;
        submission.rating = Some(rating);
        Ok(())
    }

    async fn insert_transaction(&self, tx: TransactionRecord) -> Result<()> {
        self.transactions.write().await.insert(tx.id, tx);
        Ok(())
    }

    async fn transactions_for_contest(&self, id: ContestId) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.contest_id == id)
            .cloned()
            .collect())
    }

    async fn synthetic_counts(&self) -> Result<SyntheticCounts> {
        Ok(SyntheticCounts {
            users: self
                .users
                .read()
                .await
                .values()
                .filter(|u| u.synthetic)
                .count(),
            agents: self
                .agents
                .read()
                .await
                .values()
                .filter(|a| a.synthetic)
                .count(),
            contests: self
                .contests
                .read()
                .await
                .values()
                .filter(|c| c.synthetic)
                .count(),
            submissions: self
                .submissions
                .read()
                .await
                .values()
                .filter(|s| s.synthetic)
                .count(),
            transactions: self
                .transactions
                .read()
                .await
                .values()
                .filter(|t| t.synthetic)
                .count(),
        })
    }

    async fn clear_synthetic(&self) -> Result<SyntheticCounts> {
        let counts = self.synthetic_counts().await?;
        // Children before parents, same order the REST backend uses.
        self.transactions.write().await.retain(|_, t| !t.synthetic);
        self.submissions.write().await.retain(|_, s| !s.synthetic);
        self.contests.write().await.retain(|_, c| !c.synthetic);
        self.agents.write().await.retain(|_, a| !a.synthetic);
        self.users.write().await.retain(|_, u| !u.synthetic);
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_types::FillRate;

    fn user(synthetic: bool) -> User {
        User {
            id: UserId::generate(),
            wallet_address: format!("wallet-{}", UserId::generate().short()),
            twitter_handle: None,
            synthetic,
        }
    }

    fn agent(owner: UserId) -> Agent {
        Agent {
            id: AgentId::generate(),
            owner_id: owner,
            name: "PixelSmith".to_string(),
            description: "AI agent specializing in design".to_string(),
            categories: vec!["design".to_string()],
            api_key: "synthetic_abc".to_string(),
            contests_entered: 12,
            contests_won: 3,
            total_earnings: 90_000.0,
            current_streak: 2,
            best_streak: 6,
            is_active: true,
            synthetic: true,
        }
    }

    fn open_contest(buyer: UserId) -> Contest {
        Contest {
            id: ContestId::generate(),
            buyer_id: buyer,
            title: "Logo Refresh".to_string(),
            category: "design".to_string(),
            objective: "Refresh the brand mark".to_string(),
            constraints: "Vector only".to_string(),
            evaluation_criteria: "Buyer taste".to_string(),
            deliverable_format: "SVG".to_string(),
            bounty_amount: 500.0,
            bounty_currency: "USDC".to_string(),
            deadline: Utc::now() + chrono::Duration::hours(12),
            max_submissions: 10,
            min_reputation: 0,
            state: ContestState::Open {
                fill_rate: FillRate::Medium,
                next_submission_at: Utc::now(),
            },
            synthetic: true,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_matching_wallet() {
        let store = MemoryStore::new();
        let mut first = user(true);
        first.wallet_address = "shared-wallet".to_string();
        store.insert_users(vec![first.clone()]).await.unwrap();

        let mut second = user(true);
        second.wallet_address = "shared-wallet".to_string();
        second.twitter_handle = Some("stagehand_official".to_string());
        store.upsert_user_by_wallet(second.clone()).await.unwrap();

        let found = store.user_by_wallet("shared-wallet").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
        assert!(store.user_by_id(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_contest_drops_pacing_state() {
        let store = MemoryStore::new();
        let contest = open_contest(UserId::generate());
        let id = contest.id;
        store.insert_contest(contest).await.unwrap();

        store.complete_contest(id, None).await.unwrap();
        let closed = store.contest(id).await.unwrap();
        assert_eq!(closed.state, ContestState::Completed { winner: None });

        // Rescheduling a completed contest is a no-op, not an error.
        store
            .set_next_submission_at(id, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            store.contest(id).await.unwrap().state,
            ContestState::Completed { winner: None }
        );
    }

    #[tokio::test]
    async fn test_record_agent_win_updates_counters() {
        let store = MemoryStore::new();
        let owner = user(true);
        let a = agent(owner.id);
        let id = a.id;
        store.insert_agents(vec![a]).await.unwrap();

        store.record_agent_win(id, 1500.0).await.unwrap();
        let updated = store.agent(id).await.unwrap();
        assert_eq!(updated.contests_won, 4);
        assert_eq!(updated.total_earnings, 91_500.0);
    }

    #[tokio::test]
    async fn test_clear_synthetic_spares_organic_rows() {
        let store = MemoryStore::new();
        store
            .insert_users(vec![user(true), user(false)])
            .await
            .unwrap();
        let counts = store.clear_synthetic().await.unwrap();
        assert_eq!(counts.users, 1);

        let remaining = store.synthetic_counts().await.unwrap();
        assert_eq!(remaining.users, 0);
        // The organic row survived.
        assert_eq!(store.users.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submission_queries_scope_by_contest() {
        let store = MemoryStore::new();
        let contest_a = open_contest(UserId::generate());
        let contest_b = open_contest(UserId::generate());
        let agent_id = AgentId::generate();

        for contest in [&contest_a, &contest_b] {
            store
                .insert_submission(Submission {
                    id: SubmissionId::generate(),
                    contest_id: contest.id,
                    agent_id,
                    preview_url: "https://preview.example/x".to_string(),
                    description: "entry".to_string(),
                    is_winner: false,
                    is_revision: false,
                    rating: None,
                    synthetic: true,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.submission_count(contest_a.id).await.unwrap(), 1);
        assert_eq!(
            store
                .submissions_for_contest(contest_b.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
