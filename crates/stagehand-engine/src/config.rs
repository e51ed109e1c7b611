use serde::{Deserialize, Serialize};
use stagehand_types::{FillRate, Result, StagehandError};

use crate::roller::Roller;

/// Inclusive integer band sampled uniformly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Band {
    pub min: u32,
    pub max: u32,
}

impl Band {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Roller + ?Sized>(&self, roller: &mut R) -> u32 {
        roller.int_in(self.min as i64, self.max as i64) as u32
    }
}

/// Delay range between accepted submissions for one fill-rate class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayWindow {
    pub min_delay_secs: u32,
    pub max_delay_secs: u32,
    /// Probability that the next delay is replaced by a short burst delay,
    /// modeling clustered arrivals.
    pub burst_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub fast: DelayWindow,
    pub medium: DelayWindow,
    pub slow: DelayWindow,
    pub burst_delay_secs: Band,
    /// Per-attempt acceptance probability, applied after the timing gate.
    pub accept_chance: f64,
    /// Band for the per-cycle cap on new submissions across all contests.
    pub cycle_cap: Band,
}

impl PacingConfig {
    pub fn window(&self, rate: FillRate) -> &DelayWindow {
        match rate {
            FillRate::Fast => &self.fast,
            FillRate::Medium => &self.medium,
            FillRate::Slow => &self.slow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Target band for the open synthetic contest count.
    pub target_open: Band,
    pub base_create_chance: f64,
    /// Added per missing contest below target.
    pub per_shortfall_chance: f64,
    pub max_create_chance: f64,
    /// How many submissions a freshly created contest is seeded with.
    pub initial_seed: Band,
}

/// Which bounty scale a currency uses. The three tiers keep generated
/// amounts plausible in each denomination: fractions of a volatile
/// native asset, whole USD-equivalents for stables, and large nominal
/// figures for the platform token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BountyTier {
    Volatile,
    Stable,
    Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyWeight {
    pub code: String,
    pub weight: u32,
    pub tier: BountyTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestTemplate {
    pub title: String,
    pub category: String,
    pub objective: String,
    pub constraints: String,
    pub evaluation_criteria: String,
    pub deliverable_format: String,
    pub duration_hours: Band,
}

/// Cosmetic title transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStyle {
    TitleCase,
    AllCaps,
    Lowercase,
    NoPunctuation,
    Abbreviated,
}

/// Roster entry for seeding synthetic agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSeed {
    pub name: String,
    pub categories: Vec<String>,
}

/// Full engine configuration, loaded once at startup and passed by
/// reference into every component. Never ambient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tick_interval_secs: u64,
    /// Wallet the synthetic buyer posts contests (and pays bounties) from.
    pub owner_wallet: String,
    pub preview_base_url: String,
    pub population: PopulationConfig,
    pub pacing: PacingConfig,
    pub currencies: Vec<CurrencyWeight>,
    pub templates: Vec<ContestTemplate>,
    pub title_styles: Vec<TitleStyle>,
    pub version_suffix_chance: f64,
    pub max_submissions: Band,
    /// Delay before a freshly created contest may receive its first paced
    /// submission, so creation and first entry never share a tick.
    pub first_submission_delay_secs: Band,
    pub roster: Vec<AgentSeed>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.owner_wallet.is_empty() {
            return Err(StagehandError::Configuration(
                "owner_wallet must be set".to_string(),
            ));
        }
        if self.templates.is_empty() {
            return Err(StagehandError::Configuration(
                "at least one contest template is required".to_string(),
            ));
        }
        if self.currencies.is_empty() {
            return Err(StagehandError::Configuration(
                "at least one currency weight is required".to_string(),
            ));
        }
        if self.title_styles.is_empty() {
            return Err(StagehandError::Configuration(
                "at least one title style is required".to_string(),
            ));
        }
        if self.roster.is_empty() {
            return Err(StagehandError::Configuration(
                "agent roster must not be empty".to_string(),
            ));
        }
        for chance in [
            self.pacing.accept_chance,
            self.population.base_create_chance,
            self.population.per_shortfall_chance,
            self.population.max_create_chance,
            self.version_suffix_chance,
            self.pacing.fast.burst_chance,
            self.pacing.medium.burst_chance,
            self.pacing.slow.burst_chance,
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(StagehandError::Configuration(format!(
                    "probability {} outside [0, 1]",
                    chance
                )));
            }
        }
        Ok(())
    }
}

fn template(
    title: &str,
    category: &str,
    objective: &str,
    constraints: &str,
    evaluation: &str,
    deliverable: &str,
    hours: Band,
) -> ContestTemplate {
    ContestTemplate {
        title: title.to_string(),
        category: category.to_string(),
        objective: objective.to_string(),
        constraints: constraints.to_string(),
        evaluation_criteria: evaluation.to_string(),
        deliverable_format: deliverable.to_string(),
        duration_hours: hours,
    }
}

fn seed(name: &str, categories: &[&str]) -> AgentSeed {
    AgentSeed {
        name: name.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 120,
            owner_wallet: "4rZ9sVkoEhQTgrcVkVxYeiTTZGkddJVpXiYFkeXbeWyo".to_string(),
            preview_base_url: "https://preview.stagehand.app".to_string(),
            population: PopulationConfig {
                target_open: Band::new(8, 12),
                base_create_chance: 0.3,
                per_shortfall_chance: 0.15,
                max_create_chance: 0.8,
                initial_seed: Band::new(1, 5),
            },
            pacing: PacingConfig {
                fast: DelayWindow {
                    min_delay_secs: 180,
                    max_delay_secs: 900,
                    burst_chance: 0.25,
                },
                medium: DelayWindow {
                    min_delay_secs: 600,
                    max_delay_secs: 3600,
                    burst_chance: 0.15,
                },
                slow: DelayWindow {
                    min_delay_secs: 1800,
                    max_delay_secs: 10800,
                    burst_chance: 0.08,
                },
                burst_delay_secs: Band::new(30, 120),
                accept_chance: 0.7,
                cycle_cap: Band::new(2, 5),
            },
            currencies: vec![
                CurrencyWeight {
                    code: "CLAW".to_string(),
                    weight: 70,
                    tier: BountyTier::Platform,
                },
                CurrencyWeight {
                    code: "USDC".to_string(),
                    weight: 20,
                    tier: BountyTier::Stable,
                },
                CurrencyWeight {
                    code: "ETH".to_string(),
                    weight: 10,
                    tier: BountyTier::Volatile,
                },
            ],
            templates: vec![
                template(
                    "Token Sentiment Analyzer",
                    "analytics",
                    "Track social sentiment for a given token across major venues",
                    "Refresh at least hourly; cover the top three venues",
                    "Signal accuracy against a labeled sample week",
                    "Hosted dashboard with API access",
                    Band::new(12, 72),
                ),
                template(
                    "Whale Wallet Monitor",
                    "analytics",
                    "Alert on large transfers from tracked wallets within one minute",
                    "No more than one false alert per day",
                    "Detection latency and precision over a test replay",
                    "Webhook feed plus summary report",
                    Band::new(24, 96),
                ),
                template(
                    "Automated Meme Generator",
                    "content",
                    "Produce on-brand meme images from a topic prompt",
                    "Safe-for-work output only; original compositions",
                    "Buyer picks the strongest batch of ten",
                    "ZIP of PNG images with prompts used",
                    Band::new(6, 48),
                ),
                template(
                    "Landing Page Copy Generator",
                    "content",
                    "Write conversion-focused landing copy for a product brief",
                    "Under 600 words; include three headline variants",
                    "Clarity and fit to the brief",
                    "Markdown document",
                    Band::new(6, 36),
                ),
                template(
                    "DEX Arbitrage Predictor",
                    "trading",
                    "Flag cross-venue price gaps exceeding fees before they close",
                    "Paper-trading only; log every flagged opportunity",
                    "Hit rate over a 48h observation window",
                    "Live feed plus CSV log",
                    Band::new(24, 120),
                ),
                template(
                    "NFT Collection Art Generator",
                    "design",
                    "Generate a cohesive 100-piece generative art collection",
                    "Shared palette and trait system across the set",
                    "Visual coherence judged by the buyer",
                    "Image set plus trait metadata JSON",
                    Band::new(24, 96),
                ),
                template(
                    "Smart Contract Audit Summarizer",
                    "development",
                    "Condense audit reports into actionable one-page briefs",
                    "Preserve severity labels; no hallucinated findings",
                    "Spot-check against three source reports",
                    "One brief per report, Markdown",
                    Band::new(12, 48),
                ),
                template(
                    "Governance Proposal Monitor",
                    "research",
                    "Summarize new governance proposals across tracked DAOs daily",
                    "Neutral tone; link every claim to the source",
                    "Coverage and accuracy over one week",
                    "Daily digest feed",
                    Band::new(24, 120),
                ),
            ],
            title_styles: vec![
                TitleStyle::TitleCase,
                TitleStyle::AllCaps,
                TitleStyle::Lowercase,
                TitleStyle::NoPunctuation,
                TitleStyle::Abbreviated,
            ],
            version_suffix_chance: 0.4,
            max_submissions: Band::new(10, 50),
            first_submission_delay_secs: Band::new(60, 300),
            roster: vec![
                seed("QuantOwl", &["analytics", "trading"]),
                seed("PixelSmith", &["design", "content"]),
                seed("LedgerHound", &["analytics", "research"]),
                seed("MemeForge", &["content"]),
                seed("GasGlider", &["development", "trading"]),
                seed("OracleFinch", &["research", "analytics"]),
                seed("InkMatrix", &["design"]),
                seed("ArbRaven", &["trading"]),
                seed("DocSpindle", &["content", "research"]),
                seed("AuditWren", &["development"]),
                seed("ChartLynx", &["analytics"]),
                seed("BriefBeacon", &["research", "content"]),
            ],
        }
    }
}
