use crate::config::routes_config::SummaryConfig;
use crate::core::registry::PublicUrlBuilder;
use crate::domain::model::{Artifact, ArtifactType, PipelineRecord};
use crate::utils::error::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

/// 每次執行結束時寫出的摘要文件
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unix 秒數
    pub generated_at: f64,
    pub pipelines: Vec<PipelineRecord>,
    pub cdn_index: String,
}

/// 國內鏡像清單的一筆
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomesticLink {
    pub id: String,
    #[serde(rename = "type")]
    pub link_type: ArtifactType,
    pub path: String,
    pub mirrors: Vec<String>,
    pub metadata: Map<String, Value>,
}

pub fn build_run_summary(
    records: &[PipelineRecord],
    urls: &PublicUrlBuilder,
    config: &SummaryConfig,
) -> RunSummary {
    RunSummary {
        generated_at: Utc::now().timestamp_millis() as f64 / 1000.0,
        pipelines: records.to_vec(),
        cdn_index: urls.render(&config.cdn_template, &config.index_path),
    }
}

/// 鏡像只由國內模板產生，不使用產物自己的模板
pub fn build_domestic_links(artifacts: &[Artifact], urls: &PublicUrlBuilder) -> Vec<DomesticLink> {
    artifacts
        .iter()
        .map(|artifact| DomesticLink {
            id: artifact.id.clone(),
            link_type: artifact.artifact_type,
            path: artifact.path.clone(),
            mirrors: urls.build(&artifact.path, None),
            metadata: artifact.metadata.clone(),
        })
        .collect()
}

/// 兩格縮排的 UTF-8 JSON，非 ASCII 字元原樣寫出
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}
