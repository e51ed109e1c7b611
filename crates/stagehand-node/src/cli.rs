//! Subcommand handlers. Each takes the already-built store and config
//! and runs one operation to completion.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use stagehand_engine::roller::StdRoller;
use stagehand_engine::{CycleDriver, EngineConfig, PopulationController};
use stagehand_store::MarketStore;

use crate::seed::seed_marketplace;

pub async fn run_seed(store: Arc<dyn MarketStore>, config: &EngineConfig) -> Result<()> {
    let mut roller = StdRoller::new();
    let report = seed_marketplace(store.as_ref(), config, &mut roller).await?;
    println!(
        "Seeded {} users and {} agents ({} already present)",
        report.users_created, report.agents_created, report.agents_skipped
    );
    Ok(())
}

/// Force one contest into existence, skipping the population gates.
pub async fn run_create(store: Arc<dyn MarketStore>, config: &EngineConfig) -> Result<()> {
    let agents = store.synthetic_agents().await?;
    if agents.is_empty() {
        anyhow::bail!("no synthetic agents found, run `stagehand seed` first");
    }

    let mut roller = StdRoller::new();
    let controller = PopulationController::new(config, store.as_ref());
    match controller
        .spawn(&mut roller, &agents, chrono::Utc::now())
        .await?
    {
        Some(id) => println!("Created contest {}", id),
        None => anyhow::bail!("buyer user not found, run `stagehand seed` first"),
    }
    Ok(())
}

pub async fn run_tick(store: Arc<dyn MarketStore>, config: Arc<EngineConfig>) -> Result<()> {
    let driver = CycleDriver::new(config, store);
    let report = driver.run_cycle(&mut StdRoller::new()).await?;
    println!(
        "Cycle complete: {} open, created={}, +{} submissions, {} closed, {} failures",
        report.open_contests,
        report.contest_created,
        report.submissions_added,
        report.contests_closed,
        report.failures
    );
    Ok(())
}

pub async fn run_status(store: Arc<dyn MarketStore>) -> Result<()> {
    let counts = store.synthetic_counts().await?;
    println!("Synthetic rows:");
    println!("  users:        {}", counts.users);
    println!("  agents:       {}", counts.agents);
    println!("  contests:     {}", counts.contests);
    println!("  submissions:  {}", counts.submissions);
    println!("  transactions: {}", counts.transactions);

    let recent = store.recent_synthetic_contests(10).await?;
    if recent.is_empty() {
        return Ok(());
    }
    println!("\nRecent contests:");
    for contest in recent {
        let entries = store.submission_count(contest.id).await?;
        println!(
            "  [{}] {} | {} {} | {}/{} entries | deadline {}",
            contest.status(),
            contest.title,
            contest.bounty_amount,
            contest.bounty_currency,
            entries,
            contest.max_submissions,
            contest.deadline.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}

/// Delete every synthetic row, children before parents. Refuses to run
/// without explicit confirmation.
pub async fn run_clear(store: Arc<dyn MarketStore>, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("clear deletes all synthetic rows; re-run with --yes to confirm");
    }
    let counts = store.clear_synthetic().await?;
    info!(
        users = counts.users,
        agents = counts.agents,
        contests = counts.contests,
        submissions = counts.submissions,
        transactions = counts.transactions,
        "🧹 Synthetic rows cleared"
    );
    println!(
        "Cleared {} transactions, {} submissions, {} contests, {} agents, {} users",
        counts.transactions, counts.submissions, counts.contests, counts.agents, counts.users
    );
    Ok(())
}
