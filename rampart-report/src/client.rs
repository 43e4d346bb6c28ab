//! Outbound client for the abuse-report API.

use async_trait::async_trait;
use rampart_core::config::ReportConfig;
use rampart_core::record::BlockRecord;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Result of one report attempt.
///
/// `RateLimited` and `Failed` both leave the local cooldown cache untouched;
/// they differ only in how loudly they are surfaced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Accepted { threat_score: Option<f64> },
    RateLimited,
    Failed(String),
}

/// The seam the pipeline reports through, so tests can swap in a recorder.
#[async_trait]
pub trait AbuseReporter: Send + Sync {
    async fn report(
        &self,
        record: &BlockRecord,
        categories: &[String],
        comment: &str,
    ) -> ReportOutcome;
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    data: ReportData,
}

#[derive(Debug, Deserialize)]
struct ReportData {
    threat_score: f64,
}

pub struct HttpReporter {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpReporter {
    pub fn new(config: &ReportConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = reqwest::Client::builder()
            .user_agent(format!(
                "Mozilla/5.0 (compatible; Rampart/{}; +https://github.com/rampart-sh/rampart)",
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AbuseReporter for HttpReporter {
    /// One outbound call, no internal retry. Retrying is the pipeline's
    /// decision on the next qualifying event; a stalled endpoint is cut off
    /// by the client timeout and surfaces as `Failed`.
    async fn report(
        &self,
        record: &BlockRecord,
        categories: &[String],
        comment: &str,
    ) -> ReportOutcome {
        let Some(src) = record.src else {
            return ReportOutcome::Failed("record has no source address".into());
        };

        let payload = json!({
            "ip_address": src.to_string(),
            "categories": categories,
            "comment": comment,
        });

        let resp = match self
            .http
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return ReportOutcome::Failed(e.to_string()),
        };

        match resp.status() {
            status if status.is_success() => {
                let threat_score = resp
                    .json::<ReportResponse>()
                    .await
                    .ok()
                    .map(|r| r.data.threat_score);
                ReportOutcome::Accepted { threat_score }
            }
            StatusCode::TOO_MANY_REQUESTS => ReportOutcome::RateLimited,
            status => {
                let body = resp.text().await.unwrap_or_default();
                let body = body.chars().take(200).collect::<String>();
                ReportOutcome::Failed(format!("HTTP {status}: {body}"))
            }
        }
    }
}
