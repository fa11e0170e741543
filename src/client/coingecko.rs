//! CoinGecko `simple/price` client used as the live price source.

use serde_json::Value;

use super::{ClientError, ClientResult};
use crate::feed::PriceSource;
use crate::types::{AssetConfig, FeedConfig};

const USER_AGENT: &str = concat!("pulse-rounds/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(cfg: &FeedConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.timeout_ms)
            .build()
            .map_err(|e| ClientError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Latest USD quote for `coingecko_id`.
    pub async fn fetch_usd_price(&self, coingecko_id: &str) -> ClientResult<f64> {
        let url = format!("{}/simple/price", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("ids", coingecko_id), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus { status, body });
        }

        let body: Value = resp.json().await?;
        extract_usd_price(&body, coingecko_id)
    }
}

impl PriceSource for CoinGeckoClient {
    async fn latest_price(&self, asset: &AssetConfig) -> ClientResult<f64> {
        self.fetch_usd_price(&asset.coingecko_id).await
    }
}

/// Pull `body[id].usd` out of a `simple/price` response.
///
/// Missing entries, zero and non-finite quotes are all treated as "no price".
pub fn extract_usd_price(body: &Value, coingecko_id: &str) -> ClientResult<f64> {
    let entry = body
        .get(coingecko_id)
        .ok_or_else(|| ClientError::PriceUnavailable(coingecko_id.to_string()))?;
    let usd = entry
        .get("usd")
        .ok_or_else(|| ClientError::PriceUnavailable(coingecko_id.to_string()))?;
    let price = usd
        .as_f64()
        .ok_or_else(|| ClientError::Malformed(format!("usd quote for {coingecko_id} is not a number")))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(ClientError::PriceUnavailable(coingecko_id.to_string()));
    }
    Ok(price)
}
