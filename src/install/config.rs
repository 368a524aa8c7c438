//! Shared client construction for the install pipeline.

use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

use crate::archive::TarGzExtractor;
use crate::http::HttpClient;

pub struct Config {
    pub client: HttpClient,
    pub extractor: TarGzExtractor,
}

impl Config {
    /// Build the HTTP client with the caller-supplied request timeout.
    ///
    /// The timeout bounds the only blocking stage of the pipeline; expiry
    /// surfaces downstream as a download failure.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent("vitals-install")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client: HttpClient::new(client),
            extractor: TarGzExtractor,
        })
    }
}
