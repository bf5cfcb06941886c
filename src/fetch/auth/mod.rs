//! Request decorators layered over an [`HttpClient`](super::HttpClient).

mod headers;
mod url_param;

pub use headers::WithHeaders;
pub use url_param::UrlParam;
