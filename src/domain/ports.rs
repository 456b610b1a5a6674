use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// 以輸出目錄為根的檔案儲存，路徑皆相對於根目錄
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 單次呼叫覆蓋預設請求設定
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Option<HashMap<String, String>>,
    pub timeout: Option<Duration>,
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// 依重試策略 GET 一份 JSON 文件
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value>;

    /// 單次 GET 二級文件，回傳 `field` 底下的清單
    async fn fetch_level2(&self, url: &str, field: &str) -> Result<Vec<serde_json::Value>>;

    /// 單次 GET，以文字回傳內容
    async fn fetch_text(&self, url: &str, options: &RequestOptions) -> Result<String>;
}
