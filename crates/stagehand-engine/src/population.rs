//! Keeps the count of open synthetic contests inside a target band.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use stagehand_store::MarketStore;
use stagehand_types::{Agent, ContestId};

use crate::config::EngineConfig;
use crate::generator::ContentGenerator;
use crate::roller::{shuffle, Roller};

pub struct PopulationController<'a> {
    config: &'a EngineConfig,
    store: &'a dyn MarketStore,
}

impl<'a> PopulationController<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a dyn MarketStore) -> Self {
        Self { config, store }
    }

    /// Decide once per cycle whether to materialize a new contest.
    ///
    /// The creation probability grows with the shortfall below a freshly
    /// drawn target, so an empty marketplace self-heals faster than a
    /// nearly-full one. A created contest is immediately seeded with a
    /// few entries so it never lists at zero activity.
    pub async fn maybe_spawn<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        open_count: usize,
        agents: &[Agent],
        now: DateTime<Utc>,
    ) -> Result<Option<ContestId>> {
        let pop = &self.config.population;
        let target = pop.target_open.sample(roller) as usize;
        if open_count >= target {
            debug!(open_count, target, "Population at target, no spawn");
            return Ok(None);
        }

        let shortfall = (target - open_count) as f64;
        let create_chance = (pop.base_create_chance + shortfall * pop.per_shortfall_chance)
            .min(pop.max_create_chance);
        if !roller.chance(create_chance) {
            debug!(
                open_count,
                target,
                create_chance,
                "Spawn coin flip declined"
            );
            return Ok(None);
        }

        self.spawn(roller, agents, now).await
    }

    /// Materialize one contest unconditionally, skipping the target and
    /// coin gates. Also backs the manual `create` command.
    pub async fn spawn<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        agents: &[Agent],
        now: DateTime<Utc>,
    ) -> Result<Option<ContestId>> {
        let pop = &self.config.population;
        let buyer = match self.store.user_by_wallet(&self.config.owner_wallet).await? {
            Some(user) => user,
            None => {
                warn!(
                    wallet = %self.config.owner_wallet,
                    "Buyer user not found, run seed first"
                );
                return Ok(None);
            }
        };

        let generator = ContentGenerator::new(self.config);
        let contest = generator.draft(roller, buyer.id, now)?;
        let contest_id = contest.id;
        self.store.insert_contest(contest.clone()).await?;

        // Seed a few initial entries from distinct agents.
        let mut pool: Vec<&Agent> = agents.iter().collect();
        shuffle(roller, &mut pool);
        let seed_count = (pop.initial_seed.sample(roller) as usize).min(pool.len());
        for agent in pool.iter().take(seed_count) {
            self.store
                .insert_submission(generator.entry_for(&contest, agent))
                .await?;
        }

        info!(
            contest_id = %contest_id,
            title = %contest.title,
            bounty = contest.bounty_amount,
            currency = %contest.bounty_currency,
            seeded_entries = seed_count,
            "🎬 Contest created"
        );
        Ok(Some(contest_id))
    }
}
