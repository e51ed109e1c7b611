//! One-time population of the synthetic cast: the buyer user plus the
//! agent roster, each agent with a plausible track record.

use anyhow::Result;
use tracing::info;

use stagehand_engine::config::AgentSeed;
use stagehand_engine::roller::{tx_hash, wallet_address, Roller};
use stagehand_engine::EngineConfig;
use stagehand_store::MarketStore;
use stagehand_types::{Agent, AgentId, User, UserId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub agents_created: usize,
    pub agents_skipped: usize,
}

/// Seed the marketplace cast. Safe to re-run: the buyer is matched by
/// wallet and roster agents already present are skipped by name.
pub async fn seed_marketplace<R: Roller + ?Sized>(
    store: &dyn MarketStore,
    config: &EngineConfig,
    roller: &mut R,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if store.user_by_wallet(&config.owner_wallet).await?.is_none() {
        store
            .upsert_user_by_wallet(User {
                id: UserId::generate(),
                wallet_address: config.owner_wallet.clone(),
                twitter_handle: None,
                synthetic: true,
            })
            .await?;
        report.users_created += 1;
        info!(wallet = %config.owner_wallet, "Buyer user created");
    }

    let existing: Vec<String> = store
        .synthetic_agents()
        .await?
        .into_iter()
        .map(|a| a.name)
        .collect();

    let mut users = Vec::new();
    let mut agents = Vec::new();
    for entry in &config.roster {
        if existing.iter().any(|name| name == &entry.name) {
            report.agents_skipped += 1;
            continue;
        }
        let owner = User {
            id: UserId::generate(),
            wallet_address: wallet_address(roller),
            twitter_handle: Some(format!("{}_ai", entry.name.to_lowercase())),
            synthetic: true,
        };
        agents.push(backstory(roller, entry, owner.id));
        users.push(owner);
    }

    report.users_created += users.len();
    report.agents_created = agents.len();
    if !users.is_empty() {
        store.insert_users(users).await?;
    }
    if !agents.is_empty() {
        store.insert_agents(agents).await?;
    }

    info!(
        users = report.users_created,
        agents = report.agents_created,
        skipped = report.agents_skipped,
        "🌱 Marketplace cast seeded"
    );
    Ok(report)
}

/// Fabricate a plausible competitive history for a roster agent.
fn backstory<R: Roller + ?Sized>(roller: &mut R, entry: &AgentSeed, owner_id: UserId) -> Agent {
    let contests_entered = roller.int_in(5, 50) as u32;
    let contests_won = (roller.int_in(1, 15) as u32).min(contests_entered);
    let current_streak = roller.int_in(0, 5) as u32;
    let best_streak = (roller.int_in(3, 12) as u32).max(current_streak);
    Agent {
        id: AgentId::generate(),
        owner_id,
        name: entry.name.clone(),
        description: format!("AI agent specializing in {}", entry.categories.join(", ")),
        categories: entry.categories.clone(),
        // Prefix marks the key as non-functional.
        api_key: format!("synthetic_{}", &tx_hash(roller)[2..18]),
        contests_entered,
        contests_won,
        total_earnings: roller.int_in(10_000, 500_000) as f64,
        current_streak,
        best_streak,
        is_active: true,
        synthetic: true,
    }
}
