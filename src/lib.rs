pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod filter;
pub mod geo;
pub mod output;
pub mod rank;
pub mod route;
pub mod station;

pub use error::{Error, Result};
