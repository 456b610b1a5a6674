use crate::domain::model::{Artifact, ArtifactType};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// 將 `{repo}`、`{branch}`、`{path}` 代入公開 URL 模板
#[derive(Debug, Clone)]
pub struct PublicUrlBuilder {
    repo: String,
    branch: String,
    default_templates: Vec<String>,
}

impl PublicUrlBuilder {
    /// `default_templates` 不可為空，見 `DomesticConfig::effective_templates`
    pub fn new(
        repo: impl Into<String>,
        branch: impl Into<String>,
        default_templates: Vec<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            default_templates,
        }
    }

    /// 單次替換：代入的值不會再被當成佔位符
    pub fn render(&self, template: &str, path: &str) -> String {
        let Some(re) = placeholder_re() else {
            return template.to_string();
        };
        re.replace_all(template, |caps: &Captures| match &caps[1] {
            "repo" => self.repo.clone(),
            "branch" => self.branch.clone(),
            _ => path.to_string(),
        })
        .into_owned()
    }

    /// 每個模板一個 URL，依模板順序；`templates` 為空或未給時使用預設
    pub fn build(&self, path: &str, templates: Option<&[String]>) -> Vec<String> {
        let templates = match templates {
            Some(t) if !t.is_empty() => t,
            _ => self.default_templates.as_slice(),
        };
        templates.iter().map(|t| self.render(t, path)).collect()
    }

    /// 寫入線路條目的主要 URL，即第一個產生的 URL
    pub fn primary(&self, path: &str, templates: Option<&[String]>) -> String {
        self.build(path, templates)
            .into_iter()
            .next()
            .unwrap_or_else(|| path.to_string())
    }
}

fn placeholder_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(repo|branch|path)\}").ok())
        .as_ref()
}

/// 執行期間寫出檔案的紀錄，只增不改
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    artifacts: Vec<Artifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        path: impl Into<String>,
        artifact_type: ArtifactType,
        metadata: Option<Map<String, Value>>,
        templates: Option<Vec<String>>,
    ) -> &Artifact {
        let artifact = Artifact {
            id: id.into(),
            path: path.into(),
            artifact_type,
            metadata: metadata.unwrap_or_default(),
            templates,
        };
        tracing::debug!("🗂️ Registered {:?} artifact {} at {}", artifact_type, artifact.id, artifact.path);
        self.artifacts.push(artifact);
        &self.artifacts[self.artifacts.len() - 1]
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.artifacts.iter().any(|a| a.path == path)
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}
