use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

use crate::{Error, Result};

/// Destination for encoded change records.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, group: &str, payload: &str) -> Result<()>;
}

/// POSTs each record to `{base_url}/{group}`.
#[derive(Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn group_url(&self, group: &str) -> String {
        format!("{}/{}", self.base_url, group)
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn deliver(&self, group: &str, payload: &str) -> Result<()> {
        let url = self.group_url(group);
        info!(url = %url, "Sending change record");
        debug!(url = %url, payload = %payload, "Payload");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rejected {
                url,
                status: status.as_u16(),
            });
        }

        debug!(url = %url, status = status.as_u16(), "Delivered change record");
        Ok(())
    }
}
