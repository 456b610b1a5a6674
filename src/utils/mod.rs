pub mod error;
pub mod logger;
pub mod retry;
pub mod slug;
pub mod validation;
