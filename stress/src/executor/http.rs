//! HTTP executor: POST the payload file to the target

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use tracing::trace;

use super::service::{ExecutorError, RequestExecutor};

/// Sends the payload file's bytes as a JSON body to `url`
pub struct HttpExecutor {
    client: Client,
    url: String,
}

impl HttpExecutor {
    pub fn new(url: String) -> Result<Self, ExecutorError> {
        let client = Client::builder().build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, payload: &Path) -> Result<(), ExecutorError> {
        let body = tokio::fs::read(payload)
            .await
            .map_err(|source| ExecutorError::Payload {
                path: payload.to_path_buf(),
                source,
            })?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        // Read the body so the request is timed end to end
        let bytes = response.bytes().await?;
        trace!("{} answered {} with {} bytes", self.url, status, bytes.len());

        if status.is_success() {
            Ok(())
        } else {
            Err(ExecutorError::Status(status.as_u16()))
        }
    }
}
