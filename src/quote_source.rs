//! External price source abstraction and its `reqwest`-backed implementation.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::metals::Metal;
use crate::retry::{retry_async, RetryConfig};

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Latest spot price for `metal`, in USD per troy ounce.
    async fn fetch_quote(&self, metal: Metal) -> Result<f64>;
}

#[derive(Deserialize, Debug)]
struct GoldApiResponse {
    price: f64,
}

pub struct GoldApiQuoteSource {
    client: Client,
    api_key: String,
    retry_config: RetryConfig,
}

impl GoldApiQuoteSource {
    pub fn new(api_key: String, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("building quote source HTTP client")?;
        Ok(Self { client, api_key, retry_config: RetryConfig::for_quotes() })
    }
}

#[async_trait]
impl QuoteSource for GoldApiQuoteSource {
    async fn fetch_quote(&self, metal: Metal) -> Result<f64> {
        let url = format!("https://www.goldapi.io/api/{}/USD", metal.ticker());
        let client = &self.client;
        let api_key = &self.api_key;

        retry_async(&self.retry_config, "fetch_quote", || async {
            let resp = client
                .get(&url)
                .header("x-access-token", api_key)
                .send()
                .await
                .context("sending quote request")?;

            if !resp.status().is_success() {
                return Err(anyhow!("quote source returned status {}", resp.status()));
            }
            let parsed: GoldApiResponse = resp.json().await.context("parsing quote response body")?;
            if !parsed.price.is_finite() || parsed.price <= 0.0 {
                return Err(anyhow!("quote source returned non-positive price {}", parsed.price));
            }
            Ok(parsed.price)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FixedQuoteSource {
        price: f64,
    }

    #[async_trait]
    impl QuoteSource for FixedQuoteSource {
        async fn fetch_quote(&self, _metal: Metal) -> Result<f64> {
            Ok(self.price)
        }
    }

    struct FlakyQuoteSource {
        calls: Arc<AtomicU32>,
        fail_first: u32,
        price: f64,
    }

    #[async_trait]
    impl QuoteSource for FlakyQuoteSource {
        async fn fetch_quote(&self, _metal: Metal) -> Result<f64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(anyhow!("transient failure"))
            } else {
                Ok(self.price)
            }
        }
    }

    #[tokio::test]
    async fn fixed_source_returns_its_price() {
        let source = FixedQuoteSource { price: 2000.0 };
        let price = source.fetch_quote(Metal::Xau).await.unwrap();
        assert_eq!(price, 2000.0);
    }

    #[tokio::test]
    async fn flaky_source_fails_then_succeeds_as_a_trait_object() {
        let source: Box<dyn QuoteSource> = Box::new(FlakyQuoteSource {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first: 2,
            price: 25.0,
        });
        assert!(source.fetch_quote(Metal::Xag).await.is_err());
        assert!(source.fetch_quote(Metal::Xag).await.is_err());
        assert_eq!(source.fetch_quote(Metal::Xag).await.unwrap(), 25.0);
    }
}
