//! Paces synthetic submissions onto open contests.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use stagehand_store::MarketStore;
use stagehand_types::{Agent, Contest, ContestState};

use crate::config::EngineConfig;
use crate::generator::ContentGenerator;
use crate::roller::{pick, Roller};

/// Why a pacing attempt did or did not add an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    Submitted,
    /// The acceptance coin declined an otherwise-eligible attempt.
    Declined,
    NotDue,
    ContestFull,
    NoEligibleAgents,
    NotOpen,
}

pub struct SubmissionPacer<'a> {
    config: &'a EngineConfig,
    store: &'a dyn MarketStore,
}

impl<'a> SubmissionPacer<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn MarketStore) -> Self {
        Self { config, store }
    }

    /// Possibly attach one more synthetic entry to an open contest.
    ///
    /// Gates, in order: capacity, agent eligibility, the pacing clock,
    /// then the acceptance coin. The timing gate and the coin are
    /// deliberately separate so arrivals look bursty instead of
    /// clockwork-regular. The per-cycle cap lives in the cycle driver.
    pub async fn try_submit<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        contest: &Contest,
        agents: &[Agent],
        now: DateTime<Utc>,
    ) -> Result<PaceOutcome> {
        let (fill_rate, next_submission_at) = match contest.state {
            ContestState::Open {
                fill_rate,
                next_submission_at,
            } => (fill_rate, next_submission_at),
            _ => return Ok(PaceOutcome::NotOpen),
        };

        let existing = self.store.submissions_for_contest(contest.id).await?;
        if existing.len() as u32 >= contest.max_submissions {
            debug!(contest_id = %contest.id, "Contest full");
            return Ok(PaceOutcome::ContestFull);
        }

        // Hard uniqueness: an agent never submits twice to one contest.
        let submitted: HashSet<_> = existing.iter().map(|s| s.agent_id).collect();
        let eligible: Vec<&Agent> = agents.iter().filter(|a| !submitted.contains(&a.id)).collect();
        if eligible.is_empty() {
            debug!(contest_id = %contest.id, "No agents left to submit");
            return Ok(PaceOutcome::NoEligibleAgents);
        }

        if now < next_submission_at {
            return Ok(PaceOutcome::NotDue);
        }

        if !roller.chance(self.config.pacing.accept_chance) {
            return Ok(PaceOutcome::Declined);
        }

        // Prefer category matches but never block for lack of one.
        let matching: Vec<&Agent> = eligible
            .iter()
            .filter(|a| a.covers_category(&contest.category))
            .copied()
            .collect();
        let pool = if matching.is_empty() { &eligible } else { &matching };
        let agent = match pick(roller, pool) {
            Some(agent) => *agent,
            None => return Ok(PaceOutcome::NoEligibleAgents),
        };

        let generator = ContentGenerator::new(self.config);
        self.store
            .insert_submission(generator.entry_for(contest, agent))
            .await?;

        let window = self.config.pacing.window(fill_rate);
        let mut delay_secs = roller.int_in(
            window.min_delay_secs as i64,
            window.max_delay_secs as i64,
        );
        if roller.chance(window.burst_chance) {
            delay_secs = self.config.pacing.burst_delay_secs.sample(roller) as i64;
        }
        self.store
            .set_next_submission_at(contest.id, now + Duration::seconds(delay_secs))
            .await?;

        info!(
            contest_id = %contest.id,
            agent = %agent.name,
            entries = existing.len() + 1,
            max = contest.max_submissions,
            next_in_secs = delay_secs,
            "📦 Entry added"
        );
        Ok(PaceOutcome::Submitted)
    }
}
