use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::model::{AnalysisResult, Timeframe};
use crate::source::AnalysisSource;

/// Reads `GET {base}/signals/{symbol}/{timeframe}` from a remote engine.
pub struct SignalsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SignalsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("signals base URL is invalid")?;
        if base_url.cannot_be_a_base() {
            bail!("signals base URL cannot carry a path: {}", base_url);
        }
        // Keep any path prefix when joining.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn signals_url(&self, symbol: &str, timeframe: Timeframe) -> Result<Url> {
        self.base_url
            .join(&format!("signals/{}/{}", symbol, timeframe))
            .context("failed to build signals URL")
    }
}

/// Parse a remote payload strictly: it must be the canonical shape and pass
/// the same checks applied to cache entries.
pub fn parse_signals(body: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult =
        serde_json::from_str(body).context("signals payload does not match AnalysisResult")?;
    if !result.is_well_formed() {
        bail!("signals payload failed shape checks");
    }
    Ok(result)
}

#[async_trait]
impl AnalysisSource for SignalsClient {
    async fn fetch_analysis(&self, symbol: &str, timeframe: Timeframe) -> Result<AnalysisResult> {
        let url = self.signals_url(symbol, timeframe)?;
        tracing::debug!(url = %url, "Fetching remote signals");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("signals request failed")?;
        let status = resp.status();
        let body = resp.text().await.context("failed to read signals body")?;
        if !status.is_success() {
            bail!("signals request returned {}: {}", status, body);
        }
        parse_signals(&body)
    }

    fn name(&self) -> &'static str {
        "remote-signals"
    }
}
