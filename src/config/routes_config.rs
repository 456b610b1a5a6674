use crate::utils::error::{Result, RouteError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PUBLIC_TEMPLATE: &str = "https://raw.githubusercontent.com/{repo}/{branch}/{path}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// 此 pipeline 清單的最後一筆會被移到最前面
    pub warehouse_priority: Option<String>,
    #[serde(default)]
    pub defaults: RequestDefaults,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub domestic: DomesticConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    pub readme_source: Option<ReadmeSourceConfig>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 秒數，可含小數
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl RequestDefaults {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout, default_timeout())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub blocked_keywords: Vec<String>,
    #[serde(default)]
    pub blocked_url_keywords: Vec<String>,
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomesticConfig {
    #[serde(default)]
    pub templates: Vec<String>,
}

impl DomesticConfig {
    /// 鏡像模板；未設定時退回 raw GitHub 模板
    pub fn effective_templates(&self) -> Vec<String> {
        if self.templates.is_empty() {
            vec![DEFAULT_PUBLIC_TEMPLATE.to_string()]
        } else {
            self.templates.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_path")]
    pub summary_path: String,
    #[serde(default = "default_domestic_links_path")]
    pub domestic_links_path: String,
    /// 執行摘要中以 `cdn_template` 公布的路由索引
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default = "default_cdn_template")]
    pub cdn_template: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            summary_path: default_summary_path(),
            domestic_links_path: default_domestic_links_path(),
            index_path: default_index_path(),
            cdn_template: default_cdn_template(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    RemoteStorehouse,
    LocalStorehouse,
    LocalUrlsStorehouse,
    MergeStorehouse,
    CopyRoute,
    RemoteUrls,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::RemoteStorehouse => "remote_storehouse",
            PipelineKind::LocalStorehouse => "local_storehouse",
            PipelineKind::LocalUrlsStorehouse => "local_urls_storehouse",
            PipelineKind::MergeStorehouse => "merge_storehouse",
            PipelineKind::CopyRoute => "copy_route",
            PipelineKind::RemoteUrls => "remote_urls",
        }
    }

    /// 產出為 `{urls: [...]}` 清單而非倉庫的類型
    pub fn is_url_list(&self) -> bool {
        matches!(self, PipelineKind::RemoteUrls)
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub id: String,
    pub kind: PipelineKind,
    pub source: Option<SourceConfig>,
    pub inputs: Option<Vec<String>>,
    pub input: Option<String>,
    pub expand: Option<ExpandConfig>,
    pub output: Option<String>,
    pub origin: Option<String>,
    pub store: Option<StoreConfig>,
}

impl PipelineSpec {
    pub fn new(id: impl Into<String>, kind: PipelineKind) -> Self {
        Self {
            id: id.into(),
            kind,
            source: None,
            inputs: None,
            input: None,
            expand: None,
            output: None,
            origin: None,
            store: None,
        }
    }

    /// 沒有備註的條目所使用的備註，預設為 pipeline id
    pub fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.id)
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.url.as_deref())
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.path.as_deref())
    }

    pub fn source_field<'a>(&'a self, default: &'a str) -> &'a str {
        self.source
            .as_ref()
            .and_then(|s| s.field.as_deref())
            .unwrap_or(default)
    }

    /// 此步驟會從上下文讀取的所有 pipeline id
    pub fn references(&self) -> Vec<&str> {
        match self.kind {
            PipelineKind::MergeStorehouse => self
                .inputs
                .iter()
                .flatten()
                .map(String::as_str)
                .collect(),
            PipelineKind::CopyRoute => self.input.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandConfig {
    #[serde(default = "default_level2_field")]
    pub level2_field: String,
    #[serde(default = "default_level2_output_dir")]
    pub level2_output_dir: String,
    pub level2_public_templates: Option<Vec<String>>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            level2_field: default_level2_field(),
            level2_output_dir: default_level2_output_dir(),
            level2_public_templates: None,
        }
    }
}

/// 從網路上的 README 更新本地來源清單的設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_readme_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 標記單倉線路所在行的文字
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_name_template")]
    pub name_template: String,
    #[serde(default = "default_remark_template")]
    pub remark_template: String,
    #[serde(default = "default_readme_output")]
    pub output: String,
    pub validation: Option<LinkValidationConfig>,
}

impl ReadmeSourceConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout, default_readme_timeout())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub require_json: bool,
    pub max_count: Option<usize>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl LinkValidationConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout, default_timeout())
    }
}

fn default_timeout() -> f64 {
    10.0
}

/// 負數、NaN 或溢位時改用 `fallback`
fn seconds(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

fn validate_timeout(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(RouteError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number of seconds".to_string(),
        });
    }
    validation::validate_range(field_name, value, 0.1, 600.0)
}

fn default_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_summary_path() -> String {
    "dist/meta/routes_summary.json".to_string()
}

fn default_domestic_links_path() -> String {
    "dist/meta/domestic_links.json".to_string()
}

fn default_index_path() -> String {
    "dist/routes/multi/index.json".to_string()
}

fn default_cdn_template() -> String {
    "https://cdn.jsdelivr.net/gh/{repo}@{branch}/{path}".to_string()
}

fn default_level2_field() -> String {
    "urls".to_string()
}

fn default_level2_output_dir() -> String {
    "dist/routes/storehouses".to_string()
}

fn default_readme_timeout() -> f64 {
    15.0
}

fn default_marker() -> String {
    "【单仓】".to_string()
}

fn default_name_template() -> String {
    "{name}".to_string()
}

fn default_remark_template() -> String {
    "readme sync: {name}".to_string()
}

fn default_readme_output() -> String {
    "data/readme_sources.json".to_string()
}

impl RoutesConfig {
    /// 從 TOML 檔案載入路由配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RouteError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RouteError::ConfigValidationError {
            field: "routes_toml_parsing".to_string(),
            message: format!("Routes TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GITHUB_TOKEN})；未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RouteError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn get_pipeline(&self, id: &str) -> Option<&PipelineSpec> {
        self.pipelines.iter().find(|p| p.id == id)
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.pipelines.is_empty() {
            return Err(RouteError::NoPipelines);
        }

        validation::validate_range("defaults.retries", self.defaults.retries, 1, 10)?;
        validate_timeout("defaults.timeout", self.defaults.timeout)?;

        for template in &self.domestic.templates {
            validation::validate_non_empty_string("domestic.templates", template)?;
        }

        validation::validate_relative_path("summary.summary_path", &self.summary.summary_path)?;
        validation::validate_relative_path(
            "summary.domestic_links_path",
            &self.summary.domestic_links_path,
        )?;

        // 宣告順序即執行順序，步驟只能讀取在它之前宣告的 id
        let mut declared: HashSet<&str> = HashSet::new();
        for pipeline in &self.pipelines {
            self.validate_pipeline(pipeline, &declared)?;
            if !declared.insert(pipeline.id.as_str()) {
                return Err(RouteError::ConfigValidationError {
                    field: "pipelines.id".to_string(),
                    message: format!("Duplicate pipeline id '{}'", pipeline.id),
                });
            }
        }

        if let Some(priority) = &self.warehouse_priority {
            if !declared.contains(priority.as_str()) {
                tracing::warn!(
                    "warehouse_priority '{}' does not name any pipeline; it will have no effect",
                    priority
                );
            }
        }

        if let Some(readme) = &self.readme_source {
            if readme.enabled {
                validation::validate_non_empty_string("readme_source.marker", &readme.marker)?;
                validation::validate_relative_path("readme_source.output", &readme.output)?;
                validate_timeout("readme_source.timeout", readme.timeout)?;
                if let Some(links) = readme.validation.as_ref().filter(|v| v.enabled) {
                    validate_timeout("readme_source.validation.timeout", links.timeout)?;
                }
                for url in &readme.urls {
                    validation::validate_url("readme_source.urls", url)?;
                }
            }
        }

        Ok(())
    }

    fn validate_pipeline(&self, pipeline: &PipelineSpec, declared: &HashSet<&str>) -> Result<()> {
        validation::validate_non_empty_string("pipelines.id", &pipeline.id)?;
        let field = |name: &str| format!("pipelines.{}.{}", pipeline.id, name);

        match pipeline.kind {
            PipelineKind::RemoteStorehouse | PipelineKind::RemoteUrls => {
                let url = validation::validate_required_field(
                    &field("source.url"),
                    &pipeline.source.as_ref().and_then(|s| s.url.clone()),
                )?
                .clone();
                validation::validate_url(&field("source.url"), &url)?;
            }
            PipelineKind::LocalStorehouse | PipelineKind::LocalUrlsStorehouse => {
                let path = validation::validate_required_field(
                    &field("source.path"),
                    &pipeline.source.as_ref().and_then(|s| s.path.clone()),
                )?
                .clone();
                validation::validate_relative_path(&field("source.path"), &path)?;
            }
            PipelineKind::MergeStorehouse => {
                let inputs = validation::validate_required_field(&field("inputs"), &pipeline.inputs)?;
                if inputs.is_empty() {
                    return Err(RouteError::ConfigValidationError {
                        field: field("inputs"),
                        message: "merge_storehouse needs at least one input".to_string(),
                    });
                }
            }
            PipelineKind::CopyRoute => {
                validation::validate_required_field(&field("input"), &pipeline.input)?;
            }
        }

        if pipeline.kind == PipelineKind::LocalUrlsStorehouse && pipeline.expand.is_none() {
            return Err(RouteError::MissingExpandConfig {
                pipeline: pipeline.id.clone(),
            });
        }

        for reference in pipeline.references() {
            if !declared.contains(reference) {
                return Err(RouteError::UnresolvedReference {
                    pipeline: pipeline.id.clone(),
                    reference: reference.to_string(),
                });
            }
        }

        if let Some(output) = &pipeline.output {
            validation::validate_relative_path(&field("output"), output)?;
        }

        if let Some(expand) = &pipeline.expand {
            validation::validate_non_empty_string(&field("expand.level2_field"), &expand.level2_field)?;
            validation::validate_relative_path(
                &field("expand.level2_output_dir"),
                &expand.level2_output_dir,
            )?;
        }

        Ok(())
    }
}

impl Validate for RoutesConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
