pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{HttpFetcher, LocalStorage};
pub use crate::config::RoutesConfig;
pub use crate::core::{RouteBuilder, RunReport};
pub use crate::utils::error::{Result, RouteError};
