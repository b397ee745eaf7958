#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request to metering API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metering API responded {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
