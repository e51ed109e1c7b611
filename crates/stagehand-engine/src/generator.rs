//! Randomized content generation: contest drafts and synthetic entries.
//!
//! Pure over (config, roller, clock) — persistence is the caller's job.

use chrono::{DateTime, Duration, Utc};

use stagehand_types::{
    Agent, Contest, ContestId, ContestState, FillRate, Result, StagehandError, Submission,
    SubmissionId, UserId,
};

use crate::config::{BountyTier, EngineConfig, TitleStyle};
use crate::roller::{pick, weighted_pick, Roller};

pub struct ContentGenerator<'a> {
    config: &'a EngineConfig,
}

impl<'a> ContentGenerator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Produce a complete open contest draft from a random template.
    pub fn draft<R: Roller + ?Sized>(
        &self,
        roller: &mut R,
        buyer_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Contest> {
        let template = pick(roller, &self.config.templates).ok_or_else(|| {
            StagehandError::Configuration("no contest templates configured".to_string())
        })?;

        let duration_hours = template.duration_hours.sample(roller);
        let deadline = now + Duration::hours(duration_hours as i64);

        let fill_rate = *pick(roller, &FillRate::ALL).unwrap_or(&FillRate::Medium);

        let currency = weighted_pick(roller, &self.config.currencies, |c| c.weight)
            .ok_or_else(|| {
                StagehandError::Configuration("no currency weights configured".to_string())
            })?;
        let bounty_amount = roll_bounty(roller, currency.tier);

        let style = *pick(roller, &self.config.title_styles).unwrap_or(&TitleStyle::TitleCase);
        let mut title = style_title(&template.title, style);
        if roller.chance(self.config.version_suffix_chance) {
            title.push_str(&format!(" v{}", roller.int_in(2, 5)));
        }

        let first_delay = self.config.first_submission_delay_secs.sample(roller);

        Ok(Contest {
            id: ContestId::generate(),
            buyer_id,
            title,
            category: template.category.clone(),
            objective: template.objective.clone(),
            constraints: template.constraints.clone(),
            evaluation_criteria: template.evaluation_criteria.clone(),
            deliverable_format: template.deliverable_format.clone(),
            bounty_amount,
            bounty_currency: currency.code.clone(),
            deadline,
            max_submissions: self.config.max_submissions.sample(roller),
            min_reputation: 0,
            state: ContestState::Open {
                fill_rate,
                next_submission_at: now + Duration::seconds(first_delay as i64),
            },
            synthetic: true,
        })
    }

    /// Build a synthetic entry for an agent into a contest.
    pub fn entry_for(&self, contest: &Contest, agent: &Agent) -> Submission {
        Submission {
            id: SubmissionId::generate(),
            contest_id: contest.id,
            agent_id: agent.id,
            preview_url: format!(
                "{}/{}/{}",
                self.config.preview_base_url,
                contest.id.short(),
                agent.id.short()
            ),
            description: format!(
                "Submission from {} for the {} challenge.",
                agent.name, contest.category
            ),
            is_winner: false,
            is_revision: false,
            rating: None,
            synthetic: true,
        }
    }
}

/// Bounty amount for one of the three currency scales. Bounds differ per
/// tier so amounts read plausibly in each denomination; the relative
/// scale between tiers is the part that matters.
fn roll_bounty<R: Roller + ?Sized>(roller: &mut R, tier: BountyTier) -> f64 {
    match tier {
        // Fractions of a volatile asset, 0.004..=2.0, three decimals.
        BountyTier::Volatile => roller.int_in(4, 2000) as f64 / 1000.0,
        // Whole USD-equivalents.
        BountyTier::Stable => roller.int_in(10, 5000) as f64,
        // Large nominal figures in a non-pegged platform token.
        BountyTier::Platform => roller.int_in(10_000, 5_000_000) as f64,
    }
}

/// Apply one cosmetic transform to a template title.
pub fn style_title(title: &str, style: TitleStyle) -> String {
    match style {
        TitleStyle::TitleCase => title.to_string(),
        TitleStyle::AllCaps => title.to_uppercase(),
        TitleStyle::Lowercase => title.to_lowercase(),
        TitleStyle::NoPunctuation => title
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
            .collect(),
        TitleStyle::Abbreviated => title
            .replace("Analyzer", "Anlyzr")
            .replace("Generator", "Gen")
            .replace("Automated", "Auto")
            .replace("Monitor", "Mon")
            .replace("Predictor", "Pred"),
    }
}
