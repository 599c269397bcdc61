use thiserror::Error;

/// Errors raised while compiling exclusion/rename rules into matchers.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("exclusion rule #{index} ('{pattern}') has an invalid pattern: {source}")]
    InvalidExclusionPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rename rule #{index} ('{pattern}') has an invalid pattern: {source}")]
    InvalidRenamePattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
