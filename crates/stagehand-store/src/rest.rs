//! REST backend for a hosted row store speaking the PostgREST filter
//! dialect: table-scoped endpoints with filter predicates encoded as
//! query parameters (`col=eq.v`, `col=gte.v`, `col=in.(a,b)`,
//! `col=is.null`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

use stagehand_types::{
    Agent, AgentId, Contest, ContestId, StagehandError, Submission, SubmissionId,
    TransactionRecord, User, UserId,
};

use crate::{MarketStore, SyntheticCounts};

/// Connection settings for the row store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub service_key: String,
    pub timeout_secs: u64,
}

/// Filter/query-string builder for the row store's wire dialect.
#[derive(Debug, Default, Clone)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.pairs.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Display) -> Self {
        self.pairs
            .push((column.to_string(), format!("gte.{}", value)));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Display) -> Self {
        self.pairs
            .push((column.to_string(), format!("lte.{}", value)));
        self
    }

    pub fn any_of<T: Display>(mut self, column: &str, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.pairs
            .push((column.to_string(), format!("in.({})", list)));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.pairs.push((column.to_string(), "is.null".to_string()));
        self
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.pairs.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.pairs
            .push(("order".to_string(), format!("{}.desc", column)));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.pairs.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn on_conflict(mut self, column: &str) -> Self {
        self.pairs
            .push(("on_conflict".to_string(), column.to_string()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

#[derive(Debug)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(StagehandError::Configuration(
                "store base URL is not set".to_string(),
            )
            .into());
        }
        if config.service_key.is_empty() {
            return Err(StagehandError::Configuration(
                "store service key is not set".to_string(),
            )
            .into());
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .context("service key is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let mut key = HeaderValue::from_str(&config.service_key)
            .context("service key is not a valid header value")?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn rows<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>> {
        let rows = self
            .client
            .get(self.table_url(table))
            .query(query.pairs())
            .send()
            .await
            .with_context(|| format!("select from '{}' failed", table))?
            .error_for_status()
            .with_context(|| format!("select from '{}' rejected", table))?
            .json()
            .await
            .with_context(|| format!("decoding rows from '{}' failed", table))?;
        Ok(rows)
    }

    async fn insert<T: Serialize>(&self, table: &str, body: &T) -> Result<()> {
        self.client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .with_context(|| format!("insert into '{}' failed", table))?
            .error_for_status()
            .with_context(|| format!("insert into '{}' rejected", table))?;
        Ok(())
    }

    async fn patch(&self, table: &str, query: Query, body: serde_json::Value) -> Result<()> {
        self.client
            .patch(self.table_url(table))
            .query(query.pairs())
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("update of '{}' failed", table))?
            .error_for_status()
            .with_context(|| format!("update of '{}' rejected", table))?;
        Ok(())
    }

    async fn delete(&self, table: &str, query: Query) -> Result<()> {
        self.client
            .delete(self.table_url(table))
            .query(query.pairs())
            .send()
            .await
            .with_context(|| format!("delete from '{}' failed", table))?
            .error_for_status()
            .with_context(|| format!("delete from '{}' rejected", table))?;
        Ok(())
    }

    async fn count_synthetic(&self, table: &str) -> Result<usize> {
        #[derive(serde::Deserialize)]
        struct IdOnly {
            #[serde(rename = "id")]
            _id: serde_json::Value,
        }
        let rows: Vec<IdOnly> = self
            .rows(table, Query::new().select("id").eq("synthetic", true))
            .await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl MarketStore for RestStore {
    async fn insert_users(&self, users: Vec<User>) -> Result<()> {
        self.insert("users", &users).await
    }

    async fn upsert_user_by_wallet(&self, user: User) -> Result<()> {
        self.client
            .post(self.table_url("users"))
            .query(Query::new().on_conflict("wallet_address").pairs())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&user)
            .send()
            .await
            .context("upsert into 'users' failed")?
            .error_for_status()
            .context("upsert into 'users' rejected")?;
        Ok(())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let mut rows: Vec<User> = self
            .rows("users", Query::new().eq("id", id).limit(1))
            .await?;
        Ok(rows.pop())
    }

    async fn user_by_wallet(&self, wallet: &str) -> Result<Option<User>> {
        let mut rows: Vec<User> = self
            .rows("users", Query::new().eq("wallet_address", wallet).limit(1))
            .await?;
        Ok(rows.pop())
    }

    async fn insert_agents(&self, agents: Vec<Agent>) -> Result<()> {
        self.insert("agents", &agents).await
    }

    async fn synthetic_agents(&self) -> Result<Vec<Agent>> {
        self.rows("agents", Query::new().eq("synthetic", true)).await
    }

    async fn record_agent_win(&self, id: AgentId, bounty: f64) -> Result<()> {
        // The row store has no atomic increment over REST; read then write,
        // accepting the same lost-update window the engine already tolerates.
        let mut rows: Vec<Agent> = self
            .rows("agents", Query::new().eq("id", id).limit(1))
            .await?;
        let agent = rows
            .pop()
            .ok_or_else(|| anyhow::anyhow!("agent {} not found", id))?;
        debug!(agent_id = %id, bounty = bounty, "Recording agent win");
        self.patch(
            "agents",
            Query::new().eq("id", id),
            serde_json::json!({
                "contests_won": agent.contests_won + 1,
                "total_earnings": agent.total_earnings + bounty,
            }),
        )
        .await
    }

    async fn insert_contest(&self, contest: Contest) -> Result<()> {
        self.insert("contests", &contest).await
    }

    async fn open_synthetic_contests(&self) -> Result<Vec<Contest>> {
        self.rows(
            "contests",
            Query::new().eq("synthetic", true).eq("status", "open"),
        )
        .await
    }

    async fn recent_synthetic_contests(&self, limit: usize) -> Result<Vec<Contest>> {
        self.rows(
            "contests",
            Query::new()
                .eq("synthetic", true)
                .order_desc("deadline")
                .limit(limit),
        )
        .await
    }

    async fn set_next_submission_at(&self, id: ContestId, at: DateTime<Utc>) -> Result<()> {
        // The status filter keeps a concurrent close from resurrecting
        // pacing state on a completed contest.
        self.patch(
            "contests",
            Query::new().eq("id", id).eq("status", "open"),
            serde_json::json!({ "next_submission_at": at.to_rfc3339() }),
        )
        .await
    }

    async fn complete_contest(&self, id: ContestId, winner: Option<SubmissionId>) -> Result<()> {
        self.patch(
            "contests",
            Query::new().eq("id", id),
            serde_json::json!({
                "status": "completed",
                "fill_rate": null,
                "next_submission_at": null,
                "winner_submission_id": winner.map(|w| w.to_string()),
            }),
        )
        .await
    }

    async fn insert_submission(&self, submission: Submission) -> Result<()> {
        self.insert("submissions", &submission).await
    }

    async fn submissions_for_contest(&self, id: ContestId) -> Result<Vec<Submission>> {
        self.rows("submissions", Query::new().eq("contest_id", id))
            .await
    }

    async fn submission_count(&self, id: ContestId) -> Result<u32> {
        let rows = self.submissions_for_contest(id).await?;
        Ok(rows.len() as u32)
    }

    async fn mark_winner(&self, id: SubmissionId, rating: u8) -> Result<()> {
        self.patch(
            "submissions",
            Query::new().eq("id", id),
            serde_json::json!({ "is_winner": true, "rating": rating }),
        )
        .await
    }

    async fn insert_transaction(&self, tx: TransactionRecord) -> Result<()> {
        self.insert("transactions", &tx).await
    }

    async fn transactions_for_contest(&self, id: ContestId) -> Result<Vec<TransactionRecord>> {
        self.rows("transactions", Query::new().eq("contest_id", id))
            .await
    }

    async fn synthetic_counts(&self) -> Result<SyntheticCounts> {
        Ok(SyntheticCounts {
            users: self.count_synthetic("users").await?,
            agents: self.count_synthetic("agents").await?,
            contests: self.count_synthetic("contests").await?,
            submissions: self.count_synthetic("submissions").await?,
            transactions: self.count_synthetic("transactions").await?,
        })
    }

    async fn clear_synthetic(&self) -> Result<SyntheticCounts> {
        let counts = self.synthetic_counts().await?;
        // Children before parents so foreign keys never dangle.
        for table in ["transactions", "submissions", "contests", "agents", "users"] {
            self.delete(table, Query::new().eq("synthetic", true))
                .await?;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_and_range_filters() {
        let query = Query::new()
            .eq("status", "open")
            .gte("bounty_amount", 10)
            .lte("bounty_amount", 5000);
        assert_eq!(
            query.pairs(),
            &[
                ("status".to_string(), "eq.open".to_string()),
                ("bounty_amount".to_string(), "gte.10".to_string()),
                ("bounty_amount".to_string(), "lte.5000".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_membership_and_null_filters() {
        let query = Query::new()
            .any_of("status", &["open", "reviewing"])
            .is_null("winner_submission_id");
        assert_eq!(
            query.pairs(),
            &[
                ("status".to_string(), "in.(open,reviewing)".to_string()),
                ("winner_submission_id".to_string(), "is.null".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_order_limit() {
        let query = Query::new().select("id").order_desc("deadline").limit(10);
        assert_eq!(
            query.pairs(),
            &[
                ("select".to_string(), "id".to_string()),
                ("order".to_string(), "deadline.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_connection_settings_are_fatal() {
        let err = RestStore::new(RestConfig {
            base_url: String::new(),
            service_key: "key".to_string(),
            timeout_secs: 10,
        })
        .unwrap_err();
        assert!(err.to_string().contains("base URL"));

        let err = RestStore::new(RestConfig {
            base_url: "https://rows.example.com".to_string(),
            service_key: String::new(),
            timeout_secs: 10,
        })
        .unwrap_err();
        assert!(err.to_string().contains("service key"));
    }

    #[test]
    fn test_table_url_normalizes_trailing_slash() {
        let store = RestStore::new(RestConfig {
            base_url: "https://rows.example.com/".to_string(),
            service_key: "key".to_string(),
            timeout_secs: 10,
        })
        .unwrap();
        assert_eq!(
            store.table_url("contests"),
            "https://rows.example.com/rest/v1/contests"
        );
    }
}
