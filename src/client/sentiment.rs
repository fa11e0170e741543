//! Advisory market read for the selected asset.
//!
//! Uses Gemini `generateContent` with a JSON response schema when an API key
//! is configured, a canned simulated read otherwise. Failures degrade to a
//! neutral read instead of surfacing as errors.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ClientError, ClientResult};
use crate::types::SentimentConfig;

const SIMULATED_REASONING: &str = "Simulated analysis: moving averages point to a trend \
reversal on recent volume spikes. RSI sits in a neutral zone but momentum is building.";
const UNAVAILABLE_REASONING: &str = "AI analysis unavailable at the moment.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarketAnalysis {
    pub sentiment: Sentiment,
    /// 0 to 100.
    pub confidence: u8,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl MarketAnalysis {
    fn unavailable() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0,
            reasoning: UNAVAILABLE_REASONING.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn simulated<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let sentiment = if rng.random_bool(0.5) {
            Sentiment::Bullish
        } else {
            Sentiment::Bearish
        };
        Self {
            sentiment,
            confidence: rng.random_range(60..90),
            reasoning: SIMULATED_REASONING.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    sentiment: Sentiment,
    confidence: f64,
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SentimentClient {
    http: reqwest::Client,
    cfg: SentimentConfig,
}

impl SentimentClient {
    pub fn new(cfg: &SentimentConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout_ms)
            .build()
            .map_err(|e| ClientError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    pub fn is_simulated(&self) -> bool {
        self.api_key().is_none()
    }

    fn api_key(&self) -> Option<&str> {
        self.cfg.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Read on `asset` from its most recent prices, oldest first.
    pub async fn analyze(&self, asset: &str, prices: &[f64]) -> MarketAnalysis {
        let Some(key) = self.api_key() else {
            let analysis = MarketAnalysis::simulated(&mut rand::rng());
            info!(target: "game", asset, sentiment = ?analysis.sentiment, "simulated market analysis");
            return analysis;
        };

        let skip = prices.len().saturating_sub(self.cfg.history_points);
        match self.generate(key, asset, &prices[skip..]).await {
            Ok(analysis) => {
                info!(
                    target: "game",
                    asset,
                    sentiment = ?analysis.sentiment,
                    confidence = analysis.confidence,
                    "market analysis"
                );
                analysis
            }
            Err(err) => {
                warn!(target: "game", asset, error = %err, "market analysis failed");
                MarketAnalysis::unavailable()
            }
        }
    }

    async fn generate(&self, key: &str, asset: &str, prices: &[f64]) -> ClientResult<MarketAnalysis> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model
        );
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&request_body(asset, prices))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus { status, body });
        }

        let body: Value = resp.json().await?;
        parse_analysis(&body)
    }
}

fn request_body(asset: &str, prices: &[f64]) -> Value {
    let series = prices
        .iter()
        .map(|p| format!("{p:.4}"))
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "Analyze this crypto price trend for {asset}. Prices: [{series}]. \
         Provide a JSON response with sentiment (BULLISH/BEARISH/NEUTRAL), \
         confidence (0-100), and a 1 sentence reasoning."
    );
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "sentiment": { "type": "STRING", "enum": ["BULLISH", "BEARISH", "NEUTRAL"] },
                    "confidence": { "type": "NUMBER" },
                    "reasoning": { "type": "STRING" }
                }
            }
        }
    })
}

/// Decode a `generateContent` response whose first text part is the JSON
/// analysis.
pub fn parse_analysis(body: &Value) -> ClientResult<MarketAnalysis> {
    let resp = GenerateResponse::deserialize(body)?;
    let text = resp
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| ClientError::Malformed("response has no text part".to_string()))?;

    let payload: AnalysisPayload = serde_json::from_str(&text)?;
    if !payload.confidence.is_finite() {
        return Err(ClientError::Malformed(format!(
            "confidence is not a number: {}",
            payload.confidence
        )));
    }
    Ok(MarketAnalysis {
        sentiment: payload.sentiment,
        confidence: payload.confidence.round().clamp(0.0, 100.0) as u8,
        reasoning: payload.reasoning,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wrap(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn parses_structured_answer() {
        let body = wrap(r#"{"sentiment":"BEARISH","confidence":72.6,"reasoning":"Lower highs."}"#);
        let analysis = parse_analysis(&body).unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Bearish);
        assert_eq!(analysis.confidence, 73);
        assert_eq!(analysis.reasoning, "Lower highs.");
    }

    #[test]
    fn clamps_confidence() {
        let body = wrap(r#"{"sentiment":"NEUTRAL","confidence":140,"reasoning":"Flat."}"#);
        assert_eq!(parse_analysis(&body).unwrap().confidence, 100);
    }

    #[test]
    fn rejects_empty_or_garbled_answers() {
        assert!(matches!(
            parse_analysis(&json!({ "candidates": [] })),
            Err(ClientError::Malformed(_))
        ));
        assert!(matches!(
            parse_analysis(&wrap("not json")),
            Err(ClientError::SerdeJson(_))
        ));
        assert!(parse_analysis(&wrap(r#"{"sentiment":"SIDEWAYS","confidence":5,"reasoning":""}"#)).is_err());
    }

    #[test]
    fn simulated_read_is_directional() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let a = MarketAnalysis::simulated(&mut rng);
            assert_ne!(a.sentiment, Sentiment::Neutral);
            assert!((60..90).contains(&a.confidence));
        }
    }

    #[test]
    fn prompt_uses_four_decimals() {
        let body = request_body("BTC", &[1.0, 2.5]);
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("[1.0000, 2.5000]"));
        assert!(prompt.contains("BTC"));
    }

    #[tokio::test]
    async fn missing_key_simulates() {
        let client = SentimentClient::new(&SentimentConfig::default()).unwrap();
        assert!(client.is_simulated());
        let analysis = client.analyze("CELO", &[0.6, 0.61]).await;
        assert!(analysis.confidence >= 60);
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_neutral() {
        let cfg = SentimentConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: Some("test".to_string()),
            timeout_ms: std::time::Duration::from_millis(500),
            ..SentimentConfig::default()
        };
        let client = SentimentClient::new(&cfg).unwrap();
        let analysis = client.analyze("CELO", &[0.6]).await;
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.confidence, 0);
        assert_eq!(analysis.reasoning, UNAVAILABLE_REASONING);
    }
}
