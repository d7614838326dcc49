use thiserror::Error;

#[derive(Debug, Error)]
pub enum LitscanError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Inconsistent data: {0}")]
    InconsistentData(String),

    #[error("Transient fetch error for {target}: {reason}")]
    TransientFetch { target: String, reason: String },

    #[error("Malformed response from {target}: {reason}")]
    MalformedResponse { target: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A fatal error raised while working on one term group.
    #[error("Term group '{label}' failed during {stage}: {source}")]
    TermGroup {
        label: String,
        stage: String,
        #[source]
        source: Box<LitscanError>,
    },
}

impl LitscanError {
    /// Attach the term group label and the failing stage to an error.
    pub fn for_term(self, label: &str, stage: &str) -> Self {
        LitscanError::TermGroup {
            label: label.to_string(),
            stage: stage.to_string(),
            source: Box::new(self),
        }
    }

    /// True for failures a caller may sensibly retry.
    pub fn is_transient(&self) -> bool {
        match self {
            LitscanError::TransientFetch { .. } => true,
            LitscanError::TermGroup { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LitscanError>;
