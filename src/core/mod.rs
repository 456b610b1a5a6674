pub mod context;
pub mod dispatcher;
pub mod expansion;
pub mod merge;
pub mod registry;
pub mod sanitizer;
pub mod shapes;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{Payload, RouteEntry, UrlEntry};
pub use crate::domain::ports::{SourceFetcher, Storage};
pub use crate::utils::error::Result;
pub use dispatcher::{RouteBuilder, RunReport, StepOutcome};
