//! reqwest-backed implementation of the transport collaborator.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use bililink_core::error::{LinkError, Result};
use bililink_core::transport::{HttpMethod, HttpResponse, Transport};

/// [`Transport`] over a shared `reqwest::Client`.
///
/// Timeout policy belongs here, not in the gateway; the client's
/// defaults apply unless the host configures its own.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an externally configured client (cookies, proxy, timeout).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<HttpResponse> {
        debug!(method = method.as_str(), url, "dispatching request");
        let mut builder = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect error"
            } else {
                "request error"
            };
            LinkError::transport(format!("{kind}: {e}"))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LinkError::transport(format!("failed to read body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}
