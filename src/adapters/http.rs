use crate::config::routes_config::RequestDefaults;
use crate::core::shapes;
use crate::domain::ports::{RequestOptions, SourceFetcher};
use crate::utils::error::{Result, RouteError};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;

/// 以 reqwest 實作的抓取器，帶有預設標頭、逾時與重試設定
pub struct HttpFetcher {
    client: Client,
    headers: HashMap<String, String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(defaults: &RequestDefaults) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            headers: defaults.headers.clone(),
            timeout: defaults.timeout(),
            retry: RetryPolicy::with_attempts(defaults.retries),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn build_request(&self, url: &str, options: &RequestOptions) -> RequestBuilder {
        let mut request = self.client.get(url);

        // 單次呼叫的標頭覆蓋預設標頭
        let headers = options.headers.as_ref().unwrap_or(&self.headers);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        request.timeout(options.timeout.unwrap_or(self.timeout))
    }

    async fn get_once(&self, url: &str, options: &RequestOptions) -> Result<Response> {
        tracing::debug!("📡 GET {}", url);
        let response = self.build_request(url, options).send().await?;
        let status = response.status();
        tracing::debug!("📡 {} responded with {}", url, status);

        if !status.is_success() {
            return Err(RouteError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn get_json_once(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.get_once(url, &RequestOptions::default()).await?;
        let value = response.json::<serde_json::Value>().await?;
        Ok(value)
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        retry_with_backoff(&self.retry, |attempt| {
            tracing::debug!(attempt, "Fetching {}", url);
            self.get_json_once(url)
        })
        .await
    }

    async fn fetch_level2(&self, url: &str, field: &str) -> Result<Vec<serde_json::Value>> {
        let payload = self.get_json_once(url).await?;
        shapes::level2_list(payload, url, field)
    }

    async fn fetch_text(&self, url: &str, options: &RequestOptions) -> Result<String> {
        let response = self.get_once(url, options).await?;
        Ok(response.text().await?)
    }
}
