pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod refresh;
pub mod snapshot;

pub use error::{RefreshError, Result};
