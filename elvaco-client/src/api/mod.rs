mod error;

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};
use time::OffsetDateTime;

use crate::domain::{reading::epoch_millis, Reading, Series};

pub use error::ApiError;

/// Readings requested per call. The API is never asked for a second page, so a
/// window holding more samples than this is truncated.
pub const PAGE_SIZE: usize = 100;

const SERIES_CATALOG: &str = "viewmdmserie/all";

/// The two metering API operations the ingestion core depends on.
#[async_trait::async_trait]
pub trait MeteringApi: Send + Sync {
    async fn list_series(&self) -> Result<Vec<Series>, ApiError>;

    /// Readings of `series_id` in the half-open window `[from, to)`.
    async fn fetch_readings(
        &self,
        series_id: i64,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Reading>, ApiError>;
}

#[derive(Deserialize)]
struct ReadingsPage {
    #[serde(alias = "Values", default)]
    values: Vec<Reading>,
}

/// REST client for the Elvaco MDM API, authenticated with static basic-auth credentials.
#[derive(Debug, Clone)]
pub struct ElvacoClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

/// Base URL of the REST API served by the Elvaco device at `server` (host or host:port).
pub fn base_url(server: &str) -> String {
    format!("http://{server}/Elvaco-Rest/rest/")
}

impl ElvacoClient {
    pub fn new(
        server: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url(server),
            username: username.into(),
            password: password.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        tracing::trace!(url = %url, bytes = body.len(), "metering API response");

        serde_json::from_str(&body).map_err(|source| ApiError::MalformedResponse { url, source })
    }
}

fn readings_path(series_id: i64, from: OffsetDateTime, to: OffsetDateTime) -> String {
    format!(
        "mdmdata/measurementSerieId/{}/effectiveDate/from/{}/to/{}/limit/{}/offset/0",
        series_id,
        epoch_millis(from),
        epoch_millis(to),
        PAGE_SIZE
    )
}

#[async_trait::async_trait]
impl MeteringApi for ElvacoClient {
    async fn list_series(&self) -> Result<Vec<Series>, ApiError> {
        self.get_json(SERIES_CATALOG).await
    }

    async fn fetch_readings(
        &self,
        series_id: i64,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<Reading>, ApiError> {
        let page: ReadingsPage = self.get_json(&readings_path(series_id, from, to)).await?;
        Ok(page.values)
    }
}
