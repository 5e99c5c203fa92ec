use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PolicyBranch, RuleKind};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PolicyError {
    #[error("invalid {rule} pattern {raw:?}: {reason}")]
    Configuration {
        rule: RuleKind,
        raw: String,
        reason: String,
    },

    #[error("{branch} policy does not support {subject}")]
    UnsupportedCombination {
        branch: PolicyBranch,
        subject: String,
    },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("failed to parse policy document: {0}")]
    ParseError(String),

    #[error("failed to serialize policy document: {0}")]
    SerializeError(String),
}

impl PolicyError {
    pub(crate) fn configuration(rule: RuleKind, raw: &str, reason: impl Into<String>) -> Self {
        PolicyError::Configuration {
            rule,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::ParseError(err.to_string())
    }
}
