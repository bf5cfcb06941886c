use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam shared by the station feed and the routing service.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
