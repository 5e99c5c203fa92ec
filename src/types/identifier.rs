//! Candidate identifiers extracted from a certificate request.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// The kind of name a certificate can carry and a policy can constrain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IdentifierKind {
    Dns,
    Email,
    Uri,
    IpRange,
    CommonName,
    Principal,
}

impl IdentifierKind {
    /// Plural, human readable form used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            IdentifierKind::Dns => "DNS names",
            IdentifierKind::Email => "email addresses",
            IdentifierKind::Uri => "URIs",
            IdentifierKind::IpRange => "IP addresses",
            IdentifierKind::CommonName => "common names",
            IdentifierKind::Principal => "principals",
        }
    }
}

/// A single typed value checked against policy, e.g. one SAN of a CSR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Identifier {
    kind: IdentifierKind,
    value: String,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Identifier {
            kind,
            value: value.into(),
        }
    }

    pub fn dns(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Dns, value)
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Email, value)
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Uri, value)
    }

    /// A single address (`192.0.2.1`) or a range (`10.0.0.0/24`).
    pub fn ip(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::IpRange, value)
    }

    pub fn common_name(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::CommonName, value)
    }

    pub fn principal(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Principal, value)
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {:?}", self.kind, self.value)
    }
}
