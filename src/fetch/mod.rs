mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Response, Url};

/// Issues a GET through `client`, asking for a JSON body.
pub async fn get_json<C: HttpClient + ?Sized>(client: &C, url: Url) -> reqwest::Result<Response> {
    let mut req = Request::new(Method::GET, url);
    req.headers_mut().insert(
        ACCEPT,
        HeaderValue::from_static("application/json, application/geo+json"),
    );
    client.execute(req).await
}


#[cfg(test)]
mod tests {
    use super::testing::FakeClient;
    use super::*;

    #[tokio::test]
    async fn test_get_json_sets_accept_header() {
        let client = FakeClient::with(&[(200, "{}")]);
        let url: Url = "https://example.org/stations/json".parse().unwrap();
        let resp = get_json(&client, url).await.unwrap();
        assert!(resp.status().is_success());

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].method(), Method::GET);
        assert!(
            requests[0].headers()[ACCEPT]
                .to_str()
                .unwrap()
                .contains("application/json")
        );
    }
}
