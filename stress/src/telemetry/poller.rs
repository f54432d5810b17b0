//! Remote metrics endpoint poller

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::types::TelemetryError;
use crate::events::MetricsSnapshot;

const GC_CURRENT_BYTES_USED: &str = "/rts/gc/current_bytes_used/val";
/// Some runtimes nest the gcdetails counters under `rts.gc`
const MEM_IN_USE_PATHS: [&str; 2] = [
    "/gcdetails_mem_in_use_bytes/val",
    "/rts/gc/gcdetails_mem_in_use_bytes/val",
];

/// Polls a JSON metrics endpoint once per call. Every request is bounded by
/// the configured timeout and is never retried.
pub struct MetricsPoller {
    client: Client,
    url: String,
}

impl MetricsPoller {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the endpoint and extract the two memory counters
    pub async fn poll(&self) -> Result<MetricsSnapshot, TelemetryError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status.as_u16()));
        }

        let doc: Value = response.json().await?;
        parse_snapshot(&doc)
    }
}

/// Extract `rts.gc.current_bytes_used.val` and `gcdetails_mem_in_use_bytes.val`
pub fn parse_snapshot(doc: &Value) -> Result<MetricsSnapshot, TelemetryError> {
    let gc_current_bytes_used = doc
        .pointer(GC_CURRENT_BYTES_USED)
        .and_then(as_bytes)
        .ok_or(TelemetryError::MissingField("rts.gc.current_bytes_used.val"))?;

    let mem_in_use_bytes = MEM_IN_USE_PATHS
        .iter()
        .find_map(|path| doc.pointer(path).and_then(as_bytes))
        .ok_or(TelemetryError::MissingField("gcdetails_mem_in_use_bytes.val"))?;

    Ok(MetricsSnapshot {
        gc_current_bytes_used,
        mem_in_use_bytes,
    })
}

fn as_bytes(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    })
}
