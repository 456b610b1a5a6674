use crate::domain::model::Payload;
use crate::utils::error::{Result, RouteError};
use std::collections::HashMap;

/// Pipeline 執行上下文：依宣告順序累積每個 pipeline 的輸出，只增不改
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    payloads: HashMap<String, Payload>,
    order: Vec<String>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提交步驟產出；同一次執行中每個 id 只能寫一次
    pub fn insert(&mut self, id: impl Into<String>, payload: Payload) -> Result<()> {
        let id = id.into();
        if self.payloads.contains_key(&id) {
            return Err(RouteError::ConfigValidationError {
                field: "pipelines.id".to_string(),
                message: format!("Pipeline '{}' already produced a payload in this run", id),
            });
        }
        self.order.push(id.clone());
        self.payloads.insert(id, payload);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Payload> {
        self.payloads.get(id)
    }

    /// 替 `pipeline` 查詢 `reference`，尚未提交時回傳錯誤
    pub fn resolve(&self, pipeline: &str, reference: &str) -> Result<&Payload> {
        self.get(reference)
            .ok_or_else(|| RouteError::UnresolvedReference {
                pipeline: pipeline.to_string(),
                reference: reference.to_string(),
            })
    }

    /// 依宣告順序列出已提交的 id
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RouteEntry;

    #[test]
    fn test_insert_and_get() {
        let mut context = PipelineContext::new();
        context
            .insert("first", Payload::storehouse(vec![RouteEntry::new("A", "http://a", "o")]))
            .unwrap();
        context.insert("second", Payload::urls(vec![])).unwrap();

        assert_eq!(context.get("first").unwrap().len(), 1);
        assert!(context.get("missing").is_none());
        assert_eq!(context.ids(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_insert_is_write_once() {
        let mut context = PipelineContext::new();
        context.insert("a", Payload::storehouse(vec![])).unwrap();
        assert!(context.insert("a", Payload::storehouse(vec![])).is_err());
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_resolve_reports_unresolved_reference() {
        let context = PipelineContext::new();
        match context.resolve("merged", "later") {
            Err(RouteError::UnresolvedReference { pipeline, reference }) => {
                assert_eq!(pipeline, "merged");
                assert_eq!(reference, "later");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
