use crate::core::context::PipelineContext;
use crate::domain::model::{Payload, RouteEntry};
use crate::utils::error::Result;
use std::collections::HashSet;

/// 依輸入順序串接各輸入的倉庫條目，
/// 每個 `sourceUrl` 只保留第一筆；沒有 URL 的條目會被丟棄
pub fn merge_storehouses(
    context: &PipelineContext,
    pipeline_id: &str,
    inputs: &[String],
) -> Result<Payload> {
    let mut merged: Vec<RouteEntry> = Vec::new();
    for reference in inputs {
        let payload = context.resolve(pipeline_id, reference)?;
        merged.extend(payload.route_entries().iter().cloned());
    }

    let before = merged.len();
    let deduped = dedup_by_url(merged);
    tracing::info!(
        "🔀 {}: merged {} inputs, deduplicated {} -> {} entries",
        pipeline_id,
        inputs.len(),
        before,
        deduped.len()
    );

    Ok(Payload::storehouse(deduped))
}

pub fn dedup_by_url(entries: Vec<RouteEntry>) -> Vec<RouteEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| !entry.source_url.is_empty() && seen.insert(entry.source_url.clone()))
        .collect()
}

/// 引用產出的獨立副本
pub fn copy_payload(context: &PipelineContext, pipeline_id: &str, input: &str) -> Result<Payload> {
    let payload = context.resolve(pipeline_id, input)?;
    Ok(payload.clone())
}
