use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that sets fixed headers on every request.
///
/// The station feed rejects requests that do not look like they come from a
/// browser, so it is queried with an explicit `User-Agent` and `Referer`.
pub struct WithHeaders<C> {
    pub inner: C,
    headers: HeaderMap,
}

impl<C> WithHeaders<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            headers: HeaderMap::new(),
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeaders<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }
        self.inner.execute(req).await
    }
}
