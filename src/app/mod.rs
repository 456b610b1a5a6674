pub mod readme_sync;

pub use readme_sync::{refresh_readme_sources, ReadmeParser};
