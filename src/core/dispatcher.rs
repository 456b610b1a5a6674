use crate::config::routes_config::{PipelineKind, PipelineSpec, RoutesConfig};
use crate::core::context::PipelineContext;
use crate::core::expansion::ExpansionEngine;
use crate::core::merge::{copy_payload, merge_storehouses};
use crate::core::registry::{ArtifactRegistry, PublicUrlBuilder};
use crate::core::sanitizer::FilterRules;
use crate::core::shapes::{self, detect_storehouse_shape};
use crate::core::summary::{build_domestic_links, build_run_summary, to_pretty_json};
use crate::domain::model::{Artifact, ArtifactType, Payload, PipelineRecord, RouteEntry};
use crate::domain::ports::{SourceFetcher, Storage};
use crate::utils::error::{Result, RouteError};
use serde_json::{Map, Value};
use std::time::Instant;

const DEFAULT_LOCAL_STORE_NAME: &str = "本地多仓";

/// 單一步驟的結果：成功產出，或失敗後以預設值替代
#[derive(Debug)]
pub enum StepOutcome {
    Completed(Payload),
    Recovered { fallback: Payload, error: RouteError },
}

impl StepOutcome {
    fn into_parts(self) -> (Payload, Option<String>) {
        match self {
            StepOutcome::Completed(payload) => (payload, None),
            StepOutcome::Recovered { fallback, error } => (fallback, Some(error.to_string())),
        }
    }
}

/// 一次執行除檔案以外的產出
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<PipelineRecord>,
    pub artifacts: Vec<Artifact>,
}

impl RunReport {
    pub fn failed_steps(&self) -> Vec<&PipelineRecord> {
        self.records
            .iter()
            .filter(|r| r.error.is_some() || !r.expansion_errors.is_empty())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.failed_steps().is_empty()
    }
}

/// 失敗步驟的替代空產出
pub fn default_payload(kind: PipelineKind) -> Payload {
    if kind.is_url_list() {
        Payload::urls(Vec::new())
    } else {
        Payload::storehouse(Vec::new())
    }
}

/// 在同一根目錄下依宣告順序執行 pipelines
pub struct RouteBuilder<S: Storage, F: SourceFetcher> {
    config: RoutesConfig,
    storage: S,
    fetcher: F,
    urls: PublicUrlBuilder,
    rules: FilterRules,
    context: PipelineContext,
    records: Vec<PipelineRecord>,
    registry: ArtifactRegistry,
}

impl<S: Storage, F: SourceFetcher> RouteBuilder<S, F> {
    pub fn new(
        config: RoutesConfig,
        storage: S,
        fetcher: F,
        public_repo: impl Into<String>,
        public_branch: impl Into<String>,
    ) -> Self {
        let urls = PublicUrlBuilder::new(
            public_repo,
            public_branch,
            config.domestic.effective_templates(),
        );
        let rules = FilterRules::from(&config.filters);
        Self {
            config,
            storage,
            fetcher,
            urls,
            rules,
            context: PipelineContext::new(),
            records: Vec::new(),
            registry: ArtifactRegistry::new(),
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn records(&self) -> &[PipelineRecord] {
        &self.records
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// 每個步驟執行一次，接著寫出執行摘要與國內鏡像清單。
    /// 只有致命錯誤與寫入失敗會中止執行
    pub async fn run(&mut self) -> Result<RunReport> {
        self.context = PipelineContext::new();
        self.records.clear();
        self.registry = ArtifactRegistry::new();

        if self.config.pipelines.is_empty() {
            return Err(RouteError::NoPipelines);
        }

        tracing::info!("🚀 Starting route build with {} pipelines", self.config.pipelines.len());
        let pipelines = self.config.pipelines.clone();
        for pipeline in &pipelines {
            self.run_step(pipeline).await?;
        }

        self.write_summary().await?;
        self.write_domestic_links().await?;

        let report = RunReport {
            records: self.records.clone(),
            artifacts: self.registry.artifacts().to_vec(),
        };
        tracing::info!(
            "✅ Route build finished: {} pipelines, {} artifacts, {} with errors",
            report.records.len(),
            report.artifacts.len(),
            report.failed_steps().len()
        );
        Ok(report)
    }

    async fn run_step(&mut self, pipeline: &PipelineSpec) -> Result<()> {
        tracing::info!("📡 Running pipeline {} ({})", pipeline.id, pipeline.kind);

        let started = Instant::now();
        let outcome = match self.dispatch(pipeline).await {
            Ok(payload) => StepOutcome::Completed(payload),
            Err(e) if e.is_fatal() => {
                tracing::error!("❌ Pipeline {} aborted the run: {}", pipeline.id, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("⚠️ Pipeline {} failed, using empty {} payload: {}", pipeline.id, pipeline.kind, e);
                StepOutcome::Recovered {
                    fallback: default_payload(pipeline.kind),
                    error: e,
                }
            }
        };
        let duration_ms = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
        let (mut payload, error) = outcome.into_parts();

        let mut expansion_errors = Vec::new();
        if let Some(expand) = &pipeline.expand {
            if pipeline.kind != PipelineKind::LocalUrlsStorehouse {
                if let Payload::Storehouse(store) = &mut payload {
                    let entries = std::mem::take(&mut store.store_house);
                    let engine =
                        ExpansionEngine::new(&self.storage, &self.fetcher, &self.urls, &self.rules);
                    let report = engine
                        .expand(&mut self.registry, &pipeline.id, pipeline.origin(), expand, entries)
                        .await?;
                    expansion_errors = report.failures();
                    store.store_house = report.entries;
                }
            }
        }

        if self.config.warehouse_priority.as_deref() == Some(pipeline.id.as_str()) {
            payload.promote_last();
            tracing::debug!("⭐ Promoted last entry of {} to the front", pipeline.id);
        }

        if let Some(output) = &pipeline.output {
            let bytes = to_pretty_json(&payload)?;
            self.storage.write_file(output, &bytes).await?;
            self.registry
                .register(pipeline.id.clone(), output.clone(), ArtifactType::Pipeline, None, None);
            tracing::info!("💾 {} -> {} ({} entries)", pipeline.id, output, payload.len());
        }

        self.context.insert(pipeline.id.clone(), payload)?;

        let source = match &pipeline.source {
            Some(source) => Some(serde_json::to_value(source)?),
            None => None,
        };
        self.records.push(PipelineRecord {
            id: pipeline.id.clone(),
            kind: pipeline.kind.as_str().to_string(),
            duration_ms,
            output: pipeline.output.clone(),
            source,
            inputs: pipeline.inputs.clone(),
            error,
            expansion_errors,
        });
        Ok(())
    }

    async fn dispatch(&mut self, pipeline: &PipelineSpec) -> Result<Payload> {
        match pipeline.kind {
            PipelineKind::RemoteStorehouse => self.run_remote_storehouse(pipeline).await,
            PipelineKind::LocalStorehouse => self.run_local_storehouse(pipeline).await,
            PipelineKind::LocalUrlsStorehouse => self.run_local_urls_storehouse(pipeline).await,
            PipelineKind::MergeStorehouse => merge_storehouses(
                &self.context,
                &pipeline.id,
                pipeline.inputs.as_deref().unwrap_or_default(),
            ),
            PipelineKind::CopyRoute => {
                let input = pipeline.input.as_deref().ok_or_else(|| {
                    RouteError::MissingConfigError {
                        field: format!("pipelines.{}.input", pipeline.id),
                    }
                })?;
                copy_payload(&self.context, &pipeline.id, input)
            }
            PipelineKind::RemoteUrls => self.run_remote_urls(pipeline).await,
        }
    }

    async fn run_remote_storehouse(&self, pipeline: &PipelineSpec) -> Result<Payload> {
        let url = required_url(pipeline)?;
        let document = self.fetcher.fetch_json(url).await?;
        let raw = shapes::remote_storehouse_list(document, url)?;
        let clean = self.rules.sanitize_storehouse(&raw, pipeline.origin());
        tracing::info!("📥 {}: {} of {} entries kept", pipeline.id, clean.len(), raw.len());
        Ok(Payload::storehouse(clean))
    }

    async fn run_local_storehouse(&self, pipeline: &PipelineSpec) -> Result<Payload> {
        let path = required_path(pipeline)?;
        let document = self.read_json(path).await?;
        let shape = detect_storehouse_shape(document, pipeline.source_field("storeHouse"), path)?;
        let raw = shape.into_records(pipeline.origin());
        let clean = self.rules.sanitize_storehouse(&raw, pipeline.origin());
        tracing::info!("📥 {}: {} of {} local entries kept", pipeline.id, clean.len(), raw.len());
        Ok(Payload::storehouse(clean))
    }

    /// 把本地 URL 清單發布為獨立的二級檔案，並回傳指向它的單一條目
    async fn run_local_urls_storehouse(&mut self, pipeline: &PipelineSpec) -> Result<Payload> {
        let expand = pipeline
            .expand
            .as_ref()
            .ok_or_else(|| RouteError::MissingExpandConfig {
                pipeline: pipeline.id.clone(),
            })?;
        let path = required_path(pipeline)?;
        let document = self.read_json(path).await?;
        let raw = shapes::level2_list(document, path, pipeline.source_field("urls"))?;

        let store = pipeline.store.clone().unwrap_or_default();
        let sanitize_origin = store.name.as_deref().unwrap_or(&pipeline.id);
        let clean = self.rules.sanitize_urls(&raw, sanitize_origin);

        let store_name = store
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_STORE_NAME.to_string());
        let store_remark = store
            .remark
            .clone()
            .unwrap_or_else(|| pipeline.origin().to_string());

        let engine = ExpansionEngine::new(&self.storage, &self.fetcher, &self.urls, &self.rules);
        let level2 = engine
            .persist_level2(&self.registry, &store_name, &clean, expand)
            .await?;

        let mut metadata = Map::new();
        metadata.insert("origin".to_string(), Value::String(pipeline.origin().to_string()));
        metadata.insert("store".to_string(), Value::String(store_name.clone()));
        self.registry.register(
            format!("{}::{}", pipeline.id, level2.slug),
            level2.path.clone(),
            ArtifactType::Storehouse,
            Some(metadata),
            expand.level2_public_templates.clone(),
        );

        let primary = level2
            .public_urls
            .into_iter()
            .next()
            .unwrap_or(level2.path);
        tracing::info!("📦 {}: {} urls published as {}", pipeline.id, clean.len(), primary);
        Ok(Payload::storehouse(vec![RouteEntry::new(
            store_name,
            primary,
            store_remark,
        )]))
    }

    async fn run_remote_urls(&self, pipeline: &PipelineSpec) -> Result<Payload> {
        let url = required_url(pipeline)?;
        let document = self.fetcher.fetch_json(url).await?;
        let raw = shapes::level2_list(document, url, pipeline.source_field("urls"))?;
        let clean = self.rules.sanitize_urls(&raw, pipeline.origin());
        tracing::info!("📥 {}: {} of {} urls kept", pipeline.id, clean.len(), raw.len());
        Ok(Payload::urls(clean))
    }

    async fn read_json(&self, path: &str) -> Result<Value> {
        let bytes = self.storage.read_file(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_summary(&self) -> Result<()> {
        let summary = build_run_summary(&self.records, &self.urls, &self.config.summary);
        let bytes = to_pretty_json(&summary)?;
        self.storage
            .write_file(&self.config.summary.summary_path, &bytes)
            .await?;
        tracing::info!("📝 Run summary written to {}", self.config.summary.summary_path);
        Ok(())
    }

    async fn write_domestic_links(&self) -> Result<()> {
        let links = build_domestic_links(self.registry.artifacts(), &self.urls);
        let bytes = to_pretty_json(&links)?;
        self.storage
            .write_file(&self.config.summary.domestic_links_path, &bytes)
            .await?;
        tracing::info!(
            "📝 {} domestic links written to {}",
            links.len(),
            self.config.summary.domestic_links_path
        );
        Ok(())
    }
}

fn required_url(pipeline: &PipelineSpec) -> Result<&str> {
    pipeline.source_url().ok_or_else(|| RouteError::MissingSource {
        pipeline: pipeline.id.clone(),
        field: "url".to_string(),
    })
}

fn required_path(pipeline: &PipelineSpec) -> Result<&str> {
    pipeline.source_path().ok_or_else(|| RouteError::MissingSource {
        pipeline: pipeline.id.clone(),
        field: "path".to_string(),
    })
}
