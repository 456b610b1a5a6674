//! 二級展開：指向二級文件的倉庫條目，
//! 改指向本地寫出、已過濾的 URL 清單副本

use crate::config::routes_config::ExpandConfig;
use crate::core::registry::{ArtifactRegistry, PublicUrlBuilder};
use crate::core::sanitizer::FilterRules;
use crate::domain::model::{ArtifactType, RouteEntry, UrlEntry, UrlListPayload};
use crate::domain::ports::{SourceFetcher, Storage};
use crate::utils::error::Result;
use crate::utils::slug::slugify;
use serde_json::{Map, Value};

/// 單一條目的展開結果
#[derive(Debug, Clone, PartialEq)]
pub enum EntryExpansion {
    Expanded {
        original_url: String,
        artifact_path: String,
    },
    /// 條目沒有可追蹤的 URL
    Skipped,
    /// 二級抓取或格式失敗，條目維持原樣
    Failed { url: String, error: String },
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    pub entries: Vec<RouteEntry>,
    pub outcomes: Vec<EntryExpansion>,
}

impl ExpansionReport {
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                EntryExpansion::Failed { url, error } => Some(format!("{}: {}", url, error)),
                _ => None,
            })
            .collect()
    }

    pub fn expanded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryExpansion::Expanded { .. }))
            .count()
    }
}

/// 已寫出但尚未登記的二級檔案
#[derive(Debug, Clone, PartialEq)]
pub struct Level2Artifact {
    pub slug: String,
    pub path: String,
    pub public_urls: Vec<String>,
}

pub struct ExpansionEngine<'a, S: Storage, F: SourceFetcher> {
    storage: &'a S,
    fetcher: &'a F,
    urls: &'a PublicUrlBuilder,
    rules: &'a FilterRules,
}

impl<'a, S: Storage, F: SourceFetcher> ExpansionEngine<'a, S, F> {
    pub fn new(
        storage: &'a S,
        fetcher: &'a F,
        urls: &'a PublicUrlBuilder,
        rules: &'a FilterRules,
    ) -> Self {
        Self {
            storage,
            fetcher,
            urls,
            rules,
        }
    }

    /// 依序展開 `entries`。單一條目的抓取失敗記錄在報告中，
    /// 只有寫入失敗會回傳錯誤
    pub async fn expand(
        &self,
        registry: &mut ArtifactRegistry,
        pipeline_id: &str,
        origin: &str,
        config: &ExpandConfig,
        entries: Vec<RouteEntry>,
    ) -> Result<ExpansionReport> {
        let mut report = ExpansionReport {
            entries: Vec::with_capacity(entries.len()),
            outcomes: Vec::with_capacity(entries.len()),
        };

        for entry in entries {
            if entry.source_url.is_empty() {
                report.entries.push(entry);
                report.outcomes.push(EntryExpansion::Skipped);
                continue;
            }

            let raw_urls = match self
                .fetcher
                .fetch_level2(&entry.source_url, &config.level2_field)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("⚠️ {}: cannot read level-2 list {}: {}", pipeline_id, entry.source_url, e);
                    report.outcomes.push(EntryExpansion::Failed {
                        url: entry.source_url.clone(),
                        error: e.to_string(),
                    });
                    report.entries.push(entry);
                    continue;
                }
            };

            let store_name = if entry.source_name.is_empty() {
                origin.to_string()
            } else {
                entry.source_name.clone()
            };
            let clean_urls = self.rules.sanitize_urls(&raw_urls, &store_name);
            let level2 = self
                .persist_level2(registry, &store_name, &clean_urls, config)
                .await?;

            let mut metadata = Map::new();
            metadata.insert(
                "original_level2".to_string(),
                Value::String(entry.source_url.clone()),
            );
            metadata.insert("store".to_string(), Value::String(store_name.clone()));
            registry.register(
                format!("{}::{}", pipeline_id, level2.slug),
                level2.path.clone(),
                ArtifactType::Storehouse,
                Some(metadata),
                config.level2_public_templates.clone(),
            );

            tracing::debug!(
                "🌿 {}: {} expanded into {} urls at {}",
                pipeline_id,
                store_name,
                clean_urls.len(),
                level2.path
            );

            let remark = if entry.source_remark.is_empty() {
                origin.to_string()
            } else {
                entry.source_remark.clone()
            };
            let primary = level2
                .public_urls
                .first()
                .cloned()
                .unwrap_or_else(|| level2.path.clone());

            report.outcomes.push(EntryExpansion::Expanded {
                original_url: entry.source_url,
                artifact_path: level2.path,
            });
            report
                .entries
                .push(RouteEntry::new(entry.source_name, primary, remark));
        }

        tracing::info!(
            "🌿 {}: expanded {}/{} entries",
            pipeline_id,
            report.expanded_count(),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// 在二級目錄下寫出 `{urls: [...]}`。
    /// 路徑在本次執行已登記過時，slug 會加上數字後綴
    pub async fn persist_level2(
        &self,
        registry: &ArtifactRegistry,
        store_name: &str,
        urls: &[UrlEntry],
        config: &ExpandConfig,
    ) -> Result<Level2Artifact> {
        let (slug, path) = unique_level2_path(registry, &config.level2_output_dir, store_name);

        let payload = UrlListPayload {
            urls: urls.to_vec(),
        };
        let json = serde_json::to_string_pretty(&payload)?;
        self.storage.write_file(&path, json.as_bytes()).await?;

        let public_urls = self
            .urls
            .build(&path, config.level2_public_templates.as_deref());

        Ok(Level2Artifact {
            slug,
            path,
            public_urls,
        })
    }
}

fn unique_level2_path(registry: &ArtifactRegistry, dir: &str, store_name: &str) -> (String, String) {
    let base = slugify(store_name);
    let dir = dir.trim_end_matches('/');

    let mut slug = base.clone();
    let mut suffix = 2;
    loop {
        let path = format!("{}/{}.json", dir, slug);
        if !registry.contains_path(&path) {
            return (slug, path);
        }
        slug = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{MockFetcher, MockStorage};
    use serde_json::json;

    fn builder() -> PublicUrlBuilder {
        PublicUrlBuilder::new(
            "owner/repo",
            "main",
            vec!["https://raw.example/{repo}/{branch}/{path}".to_string()],
        )
    }

    fn expand_config() -> ExpandConfig {
        ExpandConfig {
            level2_public_templates: Some(vec![
                "https://cdn.example/{repo}@{branch}/{path}".to_string(),
                "https://raw.example/{repo}/{branch}/{path}".to_string(),
            ]),
            ..ExpandConfig::default()
        }
    }

    #[tokio::test]
    async fn test_expand_rewrites_entries_and_registers_artifacts() {
        let storage = MockStorage::new();
        let fetcher = MockFetcher::new()
            .with_json("http://one/level2", json!({"urls": [
                {"name": "leaf", "url": "http://leaf/1"},
                {"url": "http://leaf/2"},
                {"name": "dropped"}
            ]}))
            .with_json("http://two/level2", json!({"urls": "broken"}));
        let urls = builder();
        let rules = FilterRules::default();
        let engine = ExpansionEngine::new(&storage, &fetcher, &urls, &rules);
        let mut registry = ArtifactRegistry::new();

        let entries = vec![
            RouteEntry::new("Store One", "http://one/level2", ""),
            RouteEntry::new("Store Two", "http://two/level2", "kept"),
            RouteEntry::new("No Url", "", "x"),
        ];
        let report = engine
            .expand(&mut registry, "remote", "origin", &expand_config(), entries)
            .await
            .unwrap();

        assert_eq!(
            report.entries[0],
            RouteEntry::new(
                "Store One",
                "https://cdn.example/owner/repo@main/dist/routes/storehouses/store-one.json",
                "origin"
            )
        );
        assert_eq!(report.entries[1].source_url, "http://two/level2");
        assert_eq!(report.entries[2].source_name, "No Url");
        assert_eq!(report.outcomes[2], EntryExpansion::Skipped);
        assert_eq!(report.failures().len(), 1);
        assert!(report.failures()[0].starts_with("http://two/level2: "));

        let written: serde_json::Value = serde_json::from_slice(
            &storage
                .get_file("dist/routes/storehouses/store-one.json")
                .await
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            written,
            json!({"urls": [
                {"name": "leaf", "url": "http://leaf/1"},
                {"name": "Store One", "url": "http://leaf/2"}
            ]})
        );

        assert_eq!(registry.len(), 1);
        let artifact = &registry.artifacts()[0];
        assert_eq!(artifact.id, "remote::store-one");
        assert_eq!(artifact.artifact_type, ArtifactType::Storehouse);
        assert_eq!(artifact.metadata.get("original_level2").unwrap(), "http://one/level2");
        assert_eq!(artifact.metadata.get("store").unwrap(), "Store One");
        assert_eq!(artifact.templates.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_colliding_slugs_get_suffixes() {
        let storage = MockStorage::new();
        let fetcher = MockFetcher::new()
            .with_json("http://a/level2", json!([{"url": "http://leaf/a"}]))
            .with_json("http://b/level2", json!([{"url": "http://leaf/b"}]));
        let urls = builder();
        let rules = FilterRules::default();
        let engine = ExpansionEngine::new(&storage, &fetcher, &urls, &rules);
        let mut registry = ArtifactRegistry::new();

        let entries = vec![
            RouteEntry::new("Same Name", "http://a/level2", "o"),
            RouteEntry::new("same-name", "http://b/level2", "o"),
        ];
        let report = engine
            .expand(&mut registry, "p", "o", &ExpandConfig::default(), entries)
            .await
            .unwrap();

        let paths: Vec<&str> = registry.artifacts().iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "dist/routes/storehouses/same-name.json",
                "dist/routes/storehouses/same-name-2.json"
            ]
        );
        assert_eq!(registry.artifacts()[1].id, "p::same-name-2");
        assert!(report.entries[1].source_url.ends_with("same-name-2.json"));
    }
}
