//! Closes expired contests: winner pick, agent bookkeeping, payout record.

use anyhow::Result;
use tracing::{debug, info, warn};

use stagehand_store::MarketStore;
use stagehand_types::{
    Agent, AgentId, Contest, TransactionId, TransactionRecord, TxStatus, TxType,
};

use crate::config::EngineConfig;
use crate::roller::{pick, tx_hash, Roller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The contest was no longer open; nothing was touched.
    AlreadyClosed,
    /// Closed with zero submissions: no winner, no payout.
    ClosedEmpty,
    ClosedWithWinner {
        agent_id: AgentId,
        /// False when the winning agent's owner could not be resolved;
        /// the payout record is then skipped but the contest still closes.
        paid: bool,
    },
}

pub struct LifecycleCloser<'a> {
    config: &'a EngineConfig,
    store: &'a dyn MarketStore,
}

impl<'a> LifecycleCloser<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn MarketStore) -> Self {
        Self { config, store }
    }

    /// Transition an expired open contest to completed.
    ///
    /// The winner is uniform-random among all submissions. That is the
    /// documented policy, a stand-in for a real judging mechanism, and
    /// is reproduced here as-is.
    pub async fn close<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        contest: &Contest,
        agents: &[Agent],
    ) -> Result<CloseOutcome> {
        if !contest.state.is_open() {
            debug!(contest_id = %contest.id, status = %contest.status(), "Close skipped, not open");
            return Ok(CloseOutcome::AlreadyClosed);
        }

        let submissions = self.store.submissions_for_contest(contest.id).await?;
        if submissions.is_empty() {
            self.store.complete_contest(contest.id, None).await?;
            info!(contest_id = %contest.id, title = %contest.title, "🏁 Closed with no entries");
            return Ok(CloseOutcome::ClosedEmpty);
        }

        let winner = pick(roller, &submissions).cloned().unwrap_or_else(|| {
            // Unreachable: submissions is non-empty.
            submissions[0].clone()
        });
        let rating = roller.int_in(4, 5) as u8;

        self.store.mark_winner(winner.id, rating).await?;
        self.store
            .complete_contest(contest.id, Some(winner.id))
            .await?;
        self.store
            .record_agent_win(winner.agent_id, contest.bounty_amount)
            .await?;

        let paid = self.record_payout(roller, contest, winner.agent_id, agents).await?;

        info!(
            contest_id = %contest.id,
            title = %contest.title,
            winner_agent = %winner.agent_id,
            rating,
            paid,
            "🏁 Closed with winner"
        );
        Ok(CloseOutcome::ClosedWithWinner {
            agent_id: winner.agent_id,
            paid,
        })
    }

    /// Resolve the winner's owning user and write the payout record.
    /// Resolution gaps are tolerated: the contest stays closed, the
    /// payout is simply skipped.
    async fn record_payout<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        contest: &Contest,
        agent_id: AgentId,
        agents: &[Agent],
    ) -> Result<bool> {
        let Some(agent) = agents.iter().find(|a| a.id == agent_id) else {
            warn!(agent_id = %agent_id, "Winning agent not in loaded set, payout skipped");
            return Ok(false);
        };
        let Some(owner) = self.store.user_by_id(agent.owner_id).await? else {
            debug!(owner_id = %agent.owner_id, "Owner not found, payout skipped");
            return Ok(false);
        };

        self.store
            .insert_transaction(TransactionRecord {
                id: TransactionId::generate(),
                from_address: self.config.owner_wallet.clone(),
                to_address: owner.wallet_address,
                amount: contest.bounty_amount,
                currency: contest.bounty_currency.clone(),
                tx_type: TxType::WinnerPayout,
                contest_id: contest.id,
                status: TxStatus::Completed,
                tx_hash: tx_hash(roller),
                synthetic: true,
            })
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roller::ScriptRoller;
    use chrono::{Duration, Utc};
    use stagehand_store::memory::MemoryStore;
    use stagehand_types::{
        ContestId, ContestState, FillRate, Submission, SubmissionId, User, UserId,
    };

    fn expired_contest(bounty: f64) -> Contest {
        Contest {
            id: ContestId::generate(),
            buyer_id: UserId::generate(),
            title: "DEX Arbitrage Predictor".to_string(),
            category: "trading".to_string(),
            objective: String::new(),
            constraints: String::new(),
            evaluation_criteria: String::new(),
            deliverable_format: String::new(),
            bounty_amount: bounty,
            bounty_currency: "CLAW".to_string(),
            deadline: Utc::now() - Duration::hours(1),
            max_submissions: 20,
            min_reputation: 0,
            state: ContestState::Open {
                fill_rate: FillRate::Medium,
                next_submission_at: Utc::now(),
            },
            synthetic: true,
        }
    }

    async fn agent_with_owner(store: &MemoryStore, name: &str) -> Agent {
        let owner = User {
            id: UserId::generate(),
            wallet_address: format!("wallet-{}", name),
            twitter_handle: None,
            synthetic: true,
        };
        store.insert_users(vec![owner.clone()]).await.unwrap();
        let agent = Agent {
            id: AgentId::generate(),
            owner_id: owner.id,
            name: name.to_string(),
            description: String::new(),
            categories: vec!["trading".to_string()],
            api_key: "synthetic_k".to_string(),
            contests_entered: 5,
            contests_won: 1,
            total_earnings: 10_000.0,
            current_streak: 0,
            best_streak: 2,
            is_active: true,
            synthetic: true,
        };
        store.insert_agents(vec![agent.clone()]).await.unwrap();
        agent
    }

    async fn entry(store: &MemoryStore, contest: &Contest, agent: &Agent) -> Submission {
        let submission = Submission {
            id: SubmissionId::generate(),
            contest_id: contest.id,
            agent_id: agent.id,
            preview_url: String::new(),
            description: String::new(),
            is_winner: false,
            is_revision: false,
            rating: None,
            synthetic: true,
        };
        store.insert_submission(submission.clone()).await.unwrap();
        submission
    }

    #[tokio::test]
    async fn test_close_with_no_submissions() {
        let config = EngineConfig::default();
        let store = MemoryStore::new();
        let contest = expired_contest(1000.0);
        store.insert_contest(contest.clone()).await.unwrap();

        let closer = LifecycleCloser::new(&config, &store);
        let mut roller = ScriptRoller::new();
        let outcome = closer.close(&mut roller, &contest, &[]).await.unwrap();
        assert_eq!(outcome, CloseOutcome::ClosedEmpty);

        let closed = store.contest(contest.id).await.unwrap();
        assert_eq!(closed.state, ContestState::Completed { winner: None });
        assert!(store
            .transactions_for_contest(contest.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_close_picks_one_winner_and_pays_out() {
        let config = EngineConfig::default();
        let store = MemoryStore::new();
        let contest = expired_contest(50_000.0);
        store.insert_contest(contest.clone()).await.unwrap();

        let mut agents = Vec::new();
        for name in ["ArbRaven", "GasGlider", "QuantOwl"] {
            agents.push(agent_with_owner(&store, name).await);
        }
        for agent in &agents {
            entry(&store, &contest, agent).await;
        }

        let closer = LifecycleCloser::new(&config, &store);
        // Winner index 1, rating pinned to 5.
        let mut roller = ScriptRoller::new().with_ints(&[1, 5]);
        let outcome = closer.close(&mut roller, &contest, &agents).await.unwrap();

        let CloseOutcome::ClosedWithWinner { agent_id, paid } = outcome else {
            panic!("expected a winner, got {:?}", outcome);
        };
        assert!(paid);

        // Exactly one submission flagged, with the scripted rating.
        let subs = store.submissions_for_contest(contest.id).await.unwrap();
        let winners: Vec<_> = subs.iter().filter(|s| s.is_winner).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].rating, Some(5));
        assert_eq!(winners[0].agent_id, agent_id);

        // Contest records the winning submission.
        let closed = store.contest(contest.id).await.unwrap();
        assert_eq!(
            closed.state,
            ContestState::Completed {
                winner: Some(winners[0].id)
            }
        );

        // Winner counters moved by exactly one win and one bounty.
        let before = agents.iter().find(|a| a.id == agent_id).unwrap();
        let after = store.agent(agent_id).await.unwrap();
        assert_eq!(after.contests_won, before.contests_won + 1);
        assert_eq!(after.total_earnings, before.total_earnings + 50_000.0);

        // Exactly one payout, for the full bounty, to the owner's wallet.
        let txs = store.transactions_for_contest(contest.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, TxType::WinnerPayout);
        assert_eq!(txs[0].status, TxStatus::Completed);
        assert_eq!(txs[0].amount, 50_000.0);
        assert_eq!(txs[0].currency, "CLAW");
        assert_eq!(txs[0].from_address, config.owner_wallet);
        assert!(txs[0].tx_hash.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_missing_owner_skips_payout_but_still_closes() {
        let config = EngineConfig::default();
        let store = MemoryStore::new();
        let contest = expired_contest(777.0);
        store.insert_contest(contest.clone()).await.unwrap();

        // Agent whose owner row does not exist.
        let orphan = Agent {
            id: AgentId::generate(),
            owner_id: UserId::generate(),
            name: "Orphan".to_string(),
            description: String::new(),
            categories: vec![],
            api_key: "synthetic_k".to_string(),
            contests_entered: 0,
            contests_won: 0,
            total_earnings: 0.0,
            current_streak: 0,
            best_streak: 0,
            is_active: true,
            synthetic: true,
        };
        store.insert_agents(vec![orphan.clone()]).await.unwrap();
        entry(&store, &contest, &orphan).await;

        let closer = LifecycleCloser::new(&config, &store);
        let mut roller = ScriptRoller::new();
        let outcome = closer
            .close(&mut roller, &contest, std::slice::from_ref(&orphan))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CloseOutcome::ClosedWithWinner {
                agent_id: orphan.id,
                paid: false
            }
        );
        assert!(!store.contest(contest.id).await.unwrap().state.is_open());
        assert!(store
            .transactions_for_contest(contest.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_closing_twice_is_idempotent() {
        let config = EngineConfig::default();
        let store = MemoryStore::new();
        let contest = expired_contest(1234.0);
        store.insert_contest(contest.clone()).await.unwrap();
        let agent = agent_with_owner(&store, "ArbRaven").await;
        entry(&store, &contest, &agent).await;

        let closer = LifecycleCloser::new(&config, &store);
        let mut roller = ScriptRoller::new();
        closer
            .close(&mut roller, &contest, std::slice::from_ref(&agent))
            .await
            .unwrap();

        // Second pass sees the stored (now completed) contest.
        let stored = store.contest(contest.id).await.unwrap();
        let outcome = closer
            .close(&mut roller, &stored, std::slice::from_ref(&agent))
            .await
            .unwrap();
        assert_eq!(outcome, CloseOutcome::AlreadyClosed);

        // Still exactly one winner and one payout.
        let subs = store.submissions_for_contest(contest.id).await.unwrap();
        assert_eq!(subs.iter().filter(|s| s.is_winner).count(), 1);
        assert_eq!(
            store
                .transactions_for_contest(contest.id)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.agent(agent.id).await.unwrap().contests_won, 2);
    }
}
