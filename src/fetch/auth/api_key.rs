use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header is validated once at construction so `execute` never has to
/// fail on a malformed name or value.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("invalid header name: {0}")]
    Name(#[from] InvalidHeaderName),
    #[error("API key is not a valid header value")]
    Value(#[from] InvalidHeaderValue),
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, ApiKeyError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())?;
        let mut key = HeaderValue::from_str(key)?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            key,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}
