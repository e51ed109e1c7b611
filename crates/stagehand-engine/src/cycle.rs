//! The scheduling loop: one cycle per tick, no persisted state of its
//! own. All state lives in the datastore.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use stagehand_store::MarketStore;

use crate::closer::LifecycleCloser;
use crate::config::EngineConfig;
use crate::pacer::{PaceOutcome, SubmissionPacer};
use crate::population::PopulationController;
use crate::roller::{shuffle, Roller};

/// What one cycle did, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub open_contests: usize,
    pub contest_created: bool,
    pub submissions_added: u32,
    pub contests_closed: u32,
    /// Per-entity store failures that were logged and skipped.
    pub failures: u32,
}

pub struct CycleDriver {
    config: Arc<EngineConfig>,
    store: Arc<dyn MarketStore>,
}

impl CycleDriver {
    pub fn new(config: Arc<EngineConfig>, store: Arc<dyn MarketStore>) -> Self {
        Self { config, store }
    }

    /// One full decision pass over all open synthetic contests.
    ///
    /// A failing write on one contest is logged and skipped; the rest of
    /// the cycle always runs. Only the initial loads are fatal for the
    /// cycle, since nothing can proceed without them.
    pub async fn run_cycle<R: Roller + ?Sized>(&self, roller: &mut R) -> Result<CycleReport> {
        let now = Utc::now();
        let mut report = CycleReport::default();

        let agents = self.store.synthetic_agents().await?;
        if agents.is_empty() {
            info!("No synthetic agents found, run seed first");
            return Ok(report);
        }

        let mut contests = self.store.open_synthetic_contests().await?;
        report.open_contests = contests.len();

        let population = PopulationController::new(&self.config, self.store.as_ref());
        match population
            .maybe_spawn(roller, contests.len(), &agents, now)
            .await
        {
            Ok(created) => report.contest_created = created.is_some(),
            Err(e) => {
                warn!(error = %e, "Contest creation failed, continuing cycle");
                report.failures += 1;
            }
        }

        // Random order so no contest is systematically favored by the
        // per-cycle submission cap.
        shuffle(roller, &mut contests);
        let mut budget = self.config.pacing.cycle_cap.sample(roller);

        let closer = LifecycleCloser::new(&self.config, self.store.as_ref());
        let pacer = SubmissionPacer::new(&self.config, self.store.as_ref());

        for contest in &contests {
            if contest.is_expired(now) {
                match closer.close(roller, contest, &agents).await {
                    Ok(_) => report.contests_closed += 1,
                    Err(e) => {
                        warn!(contest_id = %contest.id, error = %e, "Close failed, skipping");
                        report.failures += 1;
                    }
                }
                continue;
            }

            if budget == 0 {
                continue;
            }
            match pacer.try_submit(roller, contest, &agents, now).await {
                Ok(PaceOutcome::Submitted) => {
                    report.submissions_added += 1;
                    budget -= 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(contest_id = %contest.id, error = %e, "Pacing failed, skipping");
                    report.failures += 1;
                }
            }
        }

        info!(
            open_contests = report.open_contests,
            created = report.contest_created,
            submissions = report.submissions_added,
            closed = report.contests_closed,
            failures = report.failures,
            "✅ Cycle complete"
        );
        Ok(report)
    }

    /// Self-scheduling mode: run a cycle, sleep, repeat until ctrl-c.
    /// Shutdown only happens between cycles; a running cycle always
    /// finishes.
    pub async fn run_forever<R: Roller>(&self, mut roller: R) -> Result<()> {
        let interval = Duration::from_secs(self.config.tick_interval_secs);
        info!(
            interval_secs = self.config.tick_interval_secs,
            "🎭 Continuous mode started"
        );
        loop {
            if let Err(e) = self.run_cycle(&mut roller).await {
                warn!(error = %e, "Cycle failed, will retry next tick");
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("🛑 Shutting down");
                    return Ok(());
                }
            }
        }
    }
}
