//! 從網路上 README 公布的連結更新本地來源清單
//!
//! 帶有標記 (預設 `【单仓】`) 的行提供線路名稱，通常也附上 URL。
//! URL 在後面的行時，最近一個待配對的名稱會與第一個出現的 URL 配對。
//! 產出的 `{sources: [{name, url, remark}]}` 檔案供
//! `field = "sources"` 的 `local_storehouse` pipeline 讀取

use crate::config::routes_config::{LinkValidationConfig, ReadmeSourceConfig, RoutesConfig};
use crate::domain::ports::{RequestOptions, SourceFetcher, Storage};
use crate::utils::error::{Result, RouteError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const FALLBACK_NAME: &str = "单仓线路";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeSource {
    pub name: String,
    pub url: String,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadmeSourceFile {
    pub sources: Vec<ReadmeSource>,
}

pub struct ReadmeParser {
    marker: String,
    name_re: Regex,
    url_re: Regex,
    name_template: String,
}

impl ReadmeParser {
    pub fn new(marker: &str, name_template: &str) -> Result<Self> {
        let name_re = Regex::new(&format!(r"{}\s*([^：:】]+)", regex::escape(marker)))
            .map_err(|e| RouteError::InvalidConfigValueError {
                field: "readme_source.marker".to_string(),
                value: marker.to_string(),
                reason: e.to_string(),
            })?;
        let url_re = Regex::new(r"(https?://[^\s*]+)").map_err(|e| RouteError::ConfigError {
            message: format!("Invalid link pattern: {}", e),
        })?;

        Ok(Self {
            marker: marker.to_string(),
            name_re,
            url_re,
            name_template: name_template.to_string(),
        })
    }

    /// 依文件順序擷取標記連結，每個 URL 只保留第一次出現
    pub fn parse(&self, text: &str) -> Vec<ReadmeLink> {
        let mut links = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Option<String> = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let marked = line.contains(&self.marker);
            if marked {
                if let Some(caps) = self.name_re.captures(line) {
                    pending = Some(clean_name(caps[1].trim()));
                }
            }

            let Some(url) = self.find_url(line) else {
                continue;
            };
            let name = match (&pending, marked) {
                (Some(name), _) => name.clone(),
                (None, true) => FALLBACK_NAME.to_string(),
                // 沒有標記的行只在有待配對名稱時才算數
                (None, false) => continue,
            };
            pending = None;

            if seen.insert(url.clone()) {
                links.push(ReadmeLink {
                    name: self.render_name(&name),
                    url,
                });
            }
        }

        links
    }

    fn find_url(&self, line: &str) -> Option<String> {
        self.url_re.captures(line).map(|caps| {
            caps[1]
                .trim()
                .trim_end_matches(')')
                .to_string()
        })
    }

    fn render_name(&self, name: &str) -> String {
        self.name_template.replace("{name}", name)
    }
}

/// 去掉開頭的空白、括號與一個 `单仓` 前綴；清理後為空的名稱
/// 保留原樣
fn clean_name(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(|c: char| c.is_whitespace() || c == '【' || c == '】');
    let cleaned = trimmed.strip_prefix("单仓").unwrap_or(trimmed).trim();
    if cleaned.is_empty() {
        raw.to_string()
    } else {
        cleaned.to_string()
    }
}

/// 抓取第一個可用的 README，解析後覆寫 `output`。回傳寫入的來源數；
/// 沒有寫入而保留舊檔時回傳 `None`
pub async fn refresh_readme_sources<F, S>(
    config: &RoutesConfig,
    fetcher: &F,
    storage: &S,
) -> Result<Option<usize>>
where
    F: SourceFetcher,
    S: Storage,
{
    let Some(settings) = config.readme_source.as_ref().filter(|s| s.enabled) else {
        tracing::debug!("README sync disabled");
        return Ok(None);
    };

    let Some(text) = fetch_first_readme(settings, fetcher).await else {
        tracing::warn!("⚠️ No README could be fetched, keeping {}", settings.output);
        return Ok(None);
    };

    let parser = ReadmeParser::new(&settings.marker, &settings.name_template)?;
    let links = parser.parse(&text);
    if links.is_empty() {
        tracing::warn!("⚠️ README contained no marked links, keeping {}", settings.output);
        return Ok(None);
    }

    let links = match &settings.validation {
        Some(validation) if validation.enabled => {
            validate_links(links, validation, &settings.headers, fetcher).await
        }
        _ => links,
    };
    if links.is_empty() {
        tracing::warn!("⚠️ No README link passed validation, keeping {}", settings.output);
        return Ok(None);
    }

    let file = ReadmeSourceFile {
        sources: links
            .into_iter()
            .map(|link| ReadmeSource {
                remark: settings
                    .remark_template
                    .replace("{name}", &link.name)
                    .replace("{url}", &link.url),
                name: link.name,
                url: link.url,
            })
            .collect(),
    };
    let bytes = serde_json::to_vec_pretty(&file)?;
    storage.write_file(&settings.output, &bytes).await?;

    tracing::info!("✅ Synced {} README sources -> {}", file.sources.len(), settings.output);
    Ok(Some(file.sources.len()))
}

async fn fetch_first_readme<F: SourceFetcher>(
    settings: &ReadmeSourceConfig,
    fetcher: &F,
) -> Option<String> {
    let options = RequestOptions {
        headers: Some(settings.headers.clone()),
        timeout: Some(settings.timeout()),
    };

    for url in settings.urls.iter().filter(|u| !u.is_empty()) {
        match fetcher.fetch_text(url, &options).await {
            Ok(text) => return Some(text),
            Err(e) => tracing::warn!("⚠️ README {} unavailable: {}", url, e),
        }
    }
    None
}

/// 保留回應成功 (需要時也能解析為 JSON) 的連結，
/// 通過數達到 `max_count` 即停止
async fn validate_links<F: SourceFetcher>(
    links: Vec<ReadmeLink>,
    validation: &LinkValidationConfig,
    readme_headers: &HashMap<String, String>,
    fetcher: &F,
) -> Vec<ReadmeLink> {
    let headers = if readme_headers.is_empty() {
        validation.headers.clone()
    } else {
        readme_headers.clone()
    };
    let options = RequestOptions {
        headers: Some(headers),
        timeout: Some(validation.timeout()),
    };

    let mut valid = Vec::new();
    for link in links {
        if validation.max_count.is_some_and(|max| valid.len() >= max) {
            break;
        }

        let checked = match fetcher.fetch_text(&link.url, &options).await {
            Ok(body) if validation.require_json => serde_json::from_str::<serde_json::Value>(&body)
                .map(|_| ())
                .map_err(RouteError::from),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        match checked {
            Ok(()) => valid.push(link),
            Err(e) => tracing::warn!("🚫 Skipping unusable link {}: {}", link.url, e),
        }
    }
    valid
}
