use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Decorators such as [`ApiKey`](super::auth::ApiKey)
/// wrap another client and adjust the request before delegating.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
