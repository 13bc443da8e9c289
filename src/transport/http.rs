//! 基于 reqwest 的传输实现

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// reqwest 传输
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    verbose: bool,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>, verbose: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            verbose,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            verbose: false,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if self.verbose {
            debug!(method = %request.method, url = %request.url, "registry request");
        }

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if self.verbose {
            debug!(status = %status, bytes = body.len(), "registry response");
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
