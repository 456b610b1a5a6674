// Adapters 層：domain 介面的實作 (檔案系統、http)

pub mod http;
pub mod storage;

pub use http::HttpFetcher;
pub use storage::LocalStorage;
