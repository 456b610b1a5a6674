//! 單元測試用的記憶體 `Storage` 與 `SourceFetcher`

use crate::core::shapes;
use crate::domain::ports::{RequestOptions, SourceFetcher, Storage};
use crate::utils::error::{Result, RouteError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_file(&self, path: &str, data: impl AsRef<[u8]>) {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.as_ref().to_vec());
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }

    pub async fn get_json(&self, path: &str) -> Option<Value> {
        self.get_file(path)
            .await
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            RouteError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// 依 URL 回傳預設文件，其餘回應 404
#[derive(Clone, Default)]
pub struct MockFetcher {
    documents: HashMap<String, Value>,
    texts: HashMap<String, String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: &str, document: Value) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), text.to_string());
        self
    }

    fn not_found(url: &str) -> RouteError {
        RouteError::HttpStatusError {
            url: url.to_string(),
            status: 404,
        }
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_level2(&self, url: &str, field: &str) -> Result<Vec<Value>> {
        let document = self.fetch_json(url).await?;
        shapes::level2_list(document, url, field)
    }

    async fn fetch_text(&self, url: &str, _options: &RequestOptions) -> Result<String> {
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))
    }
}
