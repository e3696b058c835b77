use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A category (or other page) title that cannot exist on a wiki.
    #[error("invalid title {title:?}: {reason}")]
    InvalidTitle { title: String, reason: &'static str },

    #[error("no expansion available for template {name:?}")]
    UnexpandedTemplate { name: String },

    #[error("template expansion did not settle after {0} steps")]
    ExpansionLimit(usize),

    #[error("month table must list 12 months, found {0}")]
    MonthCount(usize),

    #[error("failed to build pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse site info: {0}")]
    SiteInfo(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_title(title: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidTitle {
            title: title.into(),
            reason,
        }
    }
}
