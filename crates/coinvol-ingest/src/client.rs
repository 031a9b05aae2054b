//! HTTP client for the markets endpoint.
//!
//! Fetches the paginated list of coins with their current price and turns
//! each entry into a `Quote` for `{coin_id}/{vs_currency}`.

use coinvol_core::{InstrumentId, Price, Quote};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Raw markets entry. Only the fields ingestion needs.
#[derive(Debug, Deserialize)]
struct RawMarketEntry {
    id: String,
    /// Kept as a JSON number so the price text can be parsed as a decimal.
    #[serde(default)]
    current_price: Option<serde_json::Number>,
}

/// Client for fetching current prices.
pub struct MarketDataClient {
    client: Client,
    config: IngestConfig,
}

impl MarketDataClient {
    pub fn new(config: IngestConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IngestError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Fetch current quotes for every instrument on the configured pages.
    ///
    /// Any failed page aborts the whole fetch so a cycle never ingests a
    /// partial instrument list. Entries without a price are skipped.
    pub async fn fetch_quotes(&self) -> IngestResult<Vec<Quote>> {
        let per_page = self.config.effective_per_page();
        let mut quotes = Vec::new();

        for page in 1..=self.config.pages.max(1) {
            let entries = self.fetch_page(page, per_page).await?;
            let received = entries.len();

            for entry in entries {
                if let Some(quote) = self.to_quote(entry) {
                    quotes.push(quote);
                }
            }

            if received < per_page as usize {
                debug!(page, received, "Short page, stopping pagination");
                break;
            }
        }

        info!(count = quotes.len(), "Fetched market quotes");
        Ok(quotes)
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> IngestResult<Vec<RawMarketEntry>> {
        debug!(url = %self.config.api_url, page, per_page, "Fetching markets page");

        let mut request = self
            .client
            .get(&self.config.api_url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("vs_currency", self.config.vs_currency.as_str()),
                ("order", self.config.order.as_str()),
                ("per_page", per_page.to_string().as_str()),
                ("page", page.to_string().as_str()),
                ("sparkline", "false"),
            ]);
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IngestError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Upstream(format!("HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IngestError::Malformed(format!("Failed to parse response: {e}")))?;

        if !body.is_array() {
            return Err(IngestError::Malformed(
                "markets response is not an array".to_string(),
            ));
        }

        serde_json::from_value(body)
            .map_err(|e| IngestError::Malformed(format!("Failed to parse market entries: {e}")))
    }

    fn to_quote(&self, entry: RawMarketEntry) -> Option<Quote> {
        let Some(number) = entry.current_price else {
            warn!(coin = %entry.id, "Skipping coin without current price");
            return None;
        };

        let instrument = match InstrumentId::pair(&entry.id, &self.config.vs_currency) {
            Ok(id) => id,
            Err(e) => {
                warn!(coin = %entry.id, error = %e, "Skipping coin with invalid id");
                return None;
            }
        };

        match Price::parse_number(&number.to_string()) {
            Ok(price) => Some(Quote::new(instrument, price)),
            Err(e) => {
                warn!(instrument = %instrument, error = %e, "Skipping unparsable price");
                None
            }
        }
    }
}
