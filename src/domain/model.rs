use serde::{Deserialize, Serialize};

/// 指向倉庫 URL 的一條具名線路
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEntry {
    pub source_name: String,
    pub source_url: String,
    pub source_remark: String,
}

impl RouteEntry {
    pub fn new(
        source_name: impl Into<String>,
        source_url: impl Into<String>,
        source_remark: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_url: source_url.into(),
            source_remark: source_remark.into(),
        }
    }
}

/// 二級清單的葉節點
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorehousePayload {
    #[serde(rename = "storeHouse")]
    pub store_house: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlListPayload {
    pub urls: Vec<UrlEntry>,
}

/// pipeline 步驟交給後續步驟並寫入輸出檔的內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Storehouse(StorehousePayload),
    Urls(UrlListPayload),
}

impl Payload {
    pub fn storehouse(entries: Vec<RouteEntry>) -> Self {
        Payload::Storehouse(StorehousePayload {
            store_house: entries,
        })
    }

    pub fn urls(entries: Vec<UrlEntry>) -> Self {
        Payload::Urls(UrlListPayload { urls: entries })
    }

    /// 倉庫產出的線路條目；URL 清單沒有
    pub fn route_entries(&self) -> &[RouteEntry] {
        match self {
            Payload::Storehouse(p) => &p.store_house,
            Payload::Urls(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Storehouse(p) => p.store_house.len(),
            Payload::Urls(p) => p.urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 把清單最後一筆移到最前面
    pub fn promote_last(&mut self) {
        match self {
            Payload::Storehouse(p) => rotate_last_to_front(&mut p.store_house),
            Payload::Urls(p) => rotate_last_to_front(&mut p.urls),
        }
    }
}

fn rotate_last_to_front<T>(items: &mut Vec<T>) {
    if let Some(last) = items.pop() {
        items.insert(0, last);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Pipeline,
    Storehouse,
}

/// 執行期間寫出的檔案，登記一次後不再變動
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub templates: Option<Vec<String>>,
}

/// 單一 pipeline 步驟的執行紀錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRecord {
    pub id: String,
    pub kind: String,
    pub duration_ms: f64,
    pub output: Option<String>,
    pub source: Option<serde_json::Value>,
    pub inputs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expansion_errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_without_tag() {
        let payload = Payload::storehouse(vec![RouteEntry::new("A", "http://a", "origin")]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"storeHouse": [
                {"sourceName": "A", "sourceUrl": "http://a", "sourceRemark": "origin"}
            ]})
        );

        let urls = Payload::urls(vec![]);
        assert_eq!(serde_json::to_value(&urls).unwrap(), serde_json::json!({"urls": []}));
    }

    #[test]
    fn test_promote_last_moves_tail_to_front() {
        let mut payload = Payload::storehouse(vec![
            RouteEntry::new("a", "http://a", ""),
            RouteEntry::new("b", "http://b", ""),
            RouteEntry::new("c", "http://c", ""),
        ]);
        payload.promote_last();
        let names: Vec<&str> = payload
            .route_entries()
            .iter()
            .map(|e| e.source_name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let mut empty = Payload::storehouse(vec![]);
        empty.promote_last();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_record_omits_empty_error_fields() {
        let record = PipelineRecord {
            id: "p".to_string(),
            kind: "copy_route".to_string(),
            duration_ms: 0.5,
            output: None,
            source: None,
            inputs: None,
            error: None,
            expansion_errors: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("expansion_errors").is_none());
        assert!(json.get("output").unwrap().is_null());
    }
}
