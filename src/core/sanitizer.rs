use crate::config::routes_config::FiltersConfig;
use crate::domain::model::{RouteEntry, UrlEntry};
use serde_json::Value;
use url::{Host, Url};

/// 轉小寫的封鎖規則；空白規則會被移除，避免封鎖所有條目
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRules {
    pub blocked_keywords: Vec<String>,
    pub blocked_url_keywords: Vec<String>,
    pub blocked_domains: Vec<String>,
}

impl FilterRules {
    pub fn new(
        blocked_keywords: &[String],
        blocked_url_keywords: &[String],
        blocked_domains: &[String],
    ) -> Self {
        Self {
            blocked_keywords: normalize_rules(blocked_keywords),
            blocked_url_keywords: normalize_rules(blocked_url_keywords),
            blocked_domains: normalize_rules(blocked_domains)
                .into_iter()
                .map(|domain| ascii_domain(&domain))
                .collect(),
        }
    }

    /// 任一規則符合即封鎖
    pub fn is_blocked(&self, name: &str, url: &str) -> bool {
        let lower_name = name.to_lowercase();
        if self
            .blocked_keywords
            .iter()
            .any(|keyword| lower_name.contains(keyword.as_str()))
        {
            return true;
        }

        let lower_url = url.to_lowercase();
        if self
            .blocked_url_keywords
            .iter()
            .any(|pattern| lower_url.contains(pattern.as_str()))
        {
            return true;
        }

        if !self.blocked_domains.is_empty() {
            let host = host_of(url);
            if self
                .blocked_domains
                .iter()
                .any(|domain| host.ends_with(domain.as_str()))
            {
                return true;
            }
        }

        false
    }

    /// 正規化倉庫紀錄，丟棄不完整或被封鎖的條目
    pub fn sanitize_storehouse(&self, entries: &[Value], origin: &str) -> Vec<RouteEntry> {
        let mut clean = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = first_text(entry, &["sourceName", "name"]).unwrap_or_default();
            let url = first_text(entry, &["sourceUrl", "url"]).unwrap_or_default();
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || url.is_empty() {
                continue;
            }
            if self.is_blocked(name, url) {
                tracing::debug!("🚫 Blocked storehouse entry {} ({})", name, url);
                continue;
            }

            let remark = first_text(entry, &["sourceRemark", "remark"]).unwrap_or(origin);
            clean.push(RouteEntry::new(name, url, remark));
        }

        clean
    }

    /// 正規化二級 URL 紀錄，缺少名稱時使用 `origin`
    pub fn sanitize_urls(&self, entries: &[Value], origin: &str) -> Vec<UrlEntry> {
        let mut clean = Vec::with_capacity(entries.len());

        for entry in entries {
            let name = first_text(entry, &["name", "sourceName"]).unwrap_or(origin).trim();
            let url = first_text(entry, &["url", "sourceUrl"]).unwrap_or_default().trim();
            if url.is_empty() {
                continue;
            }
            if self.is_blocked(name, url) {
                tracing::debug!("🚫 Blocked url entry {} ({})", name, url);
                continue;
            }

            clean.push(UrlEntry {
                name: name.to_string(),
                url: url.to_string(),
            });
        }

        clean
    }
}

impl From<&FiltersConfig> for FilterRules {
    fn from(filters: &FiltersConfig) -> Self {
        Self::new(
            &filters.blocked_keywords,
            &filters.blocked_url_keywords,
            &filters.blocked_domains,
        )
    }
}

fn normalize_rules(rules: &[String]) -> Vec<String> {
    rules
        .iter()
        .map(|rule| rule.trim().to_lowercase())
        .filter(|rule| !rule.is_empty())
        .collect()
}

/// 別名欄位中第一個非空字串
fn first_text<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// 解析後的 host 是 IDNA 編碼，網域規則也以相同方式編碼
fn ascii_domain(rule: &str) -> String {
    match Host::parse(rule) {
        Ok(Host::Domain(domain)) => domain,
        _ => rule.to_string(),
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}
