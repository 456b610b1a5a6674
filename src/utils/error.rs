use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("No pipelines configured")]
    NoPipelines,

    #[error("Pipeline '{pipeline}' of kind local_urls_storehouse requires an expand table")]
    MissingExpandConfig { pipeline: String },

    #[error("Pipeline '{pipeline}' references '{reference}', which has not produced any data")]
    UnresolvedReference { pipeline: String, reference: String },

    #[error("Pipeline '{pipeline}' has no source.{field} configured")]
    MissingSource { pipeline: String, field: String },

    #[error("Unexpected payload shape in {context}: {message}")]
    UnexpectedShape { context: String, message: String },

    #[error("Field '{field}' in {url} is not a list")]
    NotAList { url: String, field: String },
}

pub type Result<T> = std::result::Result<T, RouteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Filesystem,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RouteError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RouteError::HttpError(_) | RouteError::HttpStatusError { .. } => ErrorCategory::Network,
            RouteError::IoError(_) => ErrorCategory::Filesystem,
            RouteError::SerializationError(_)
            | RouteError::UnexpectedShape { .. }
            | RouteError::NotAList { .. } => ErrorCategory::Data,
            RouteError::ConfigError { .. }
            | RouteError::MissingConfigError { .. }
            | RouteError::InvalidConfigValueError { .. }
            | RouteError::ConfigValidationError { .. }
            | RouteError::NoPipelines
            | RouteError::MissingExpandConfig { .. }
            | RouteError::UnresolvedReference { .. }
            | RouteError::MissingSource { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RouteError::HttpError(_) | RouteError::HttpStatusError { .. } => ErrorSeverity::Medium,
            RouteError::SerializationError(_)
            | RouteError::UnexpectedShape { .. }
            | RouteError::NotAList { .. }
            | RouteError::MissingSource { .. } => ErrorSeverity::High,
            _ => ErrorSeverity::Critical,
        }
    }

    /// 致命錯誤中止整次執行，其他錯誤只影響單一步驟或條目
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RouteError::ConfigError { .. }
                | RouteError::MissingConfigError { .. }
                | RouteError::InvalidConfigValueError { .. }
                | RouteError::ConfigValidationError { .. }
                | RouteError::NoPipelines
                | RouteError::MissingExpandConfig { .. }
                | RouteError::UnresolvedReference { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RouteError::HttpError(_) | RouteError::HttpStatusError { .. } => {
                "Check that the source endpoint is reachable, or raise defaults.retries / defaults.timeout"
            }
            RouteError::IoError(_) => "Check that the root directory exists and is writable",
            RouteError::SerializationError(_) | RouteError::UnexpectedShape { .. } => {
                "Check that the source document is valid JSON in one of the supported shapes"
            }
            RouteError::NotAList { .. } => "Check the expand.level2_field setting for this pipeline",
            RouteError::NoPipelines => "Declare at least one [[pipelines]] table in the config",
            RouteError::MissingExpandConfig { .. } => {
                "Add a [pipelines.expand] table to the local_urls_storehouse pipeline"
            }
            RouteError::UnresolvedReference { .. } => {
                "Reference only pipelines declared earlier in the config"
            }
            _ => "Review the configuration file",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch a remote source: {}", self),
            ErrorCategory::Filesystem => format!("Could not read or write a file: {}", self),
            ErrorCategory::Data => format!("A source returned unexpected data: {}", self),
            ErrorCategory::Configuration => format!("The configuration is invalid: {}", self),
        }
    }
}
