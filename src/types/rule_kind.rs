//! The enumerated rule fields of an allow or deny rule set.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::IdentifierKind;

/// One configurable pattern field, named after the command that edits it.
///
/// Every rule kind serves exactly one [`IdentifierKind`] and is either a
/// regex field or a field whose match mode is derived from the pattern syntax.
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
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RuleKind {
    Dns,
    DnsRegex,
    Email,
    EmailRegex,
    UriConstraint,
    UriRegex,
    Ip,
    #[serde(rename = "cn")]
    #[strum(serialize = "cn")]
    CommonName,
    #[serde(rename = "cn-regex")]
    #[strum(serialize = "cn-regex")]
    CommonNameRegex,
    Principal,
    PrincipalRegex,
}

const DNS_RULES: &[RuleKind] = &[RuleKind::Dns, RuleKind::DnsRegex];
const EMAIL_RULES: &[RuleKind] = &[RuleKind::Email, RuleKind::EmailRegex];
const URI_RULES: &[RuleKind] = &[RuleKind::UriConstraint, RuleKind::UriRegex];
const IP_RULES: &[RuleKind] = &[RuleKind::Ip];
const CN_RULES: &[RuleKind] = &[RuleKind::CommonName, RuleKind::CommonNameRegex];
const PRINCIPAL_RULES: &[RuleKind] = &[RuleKind::Principal, RuleKind::PrincipalRegex];

impl RuleKind {
    pub fn identifier_kind(&self) -> IdentifierKind {
        match self {
            RuleKind::Dns | RuleKind::DnsRegex => IdentifierKind::Dns,
            RuleKind::Email | RuleKind::EmailRegex => IdentifierKind::Email,
            RuleKind::UriConstraint | RuleKind::UriRegex => IdentifierKind::Uri,
            RuleKind::Ip => IdentifierKind::IpRange,
            RuleKind::CommonName | RuleKind::CommonNameRegex => IdentifierKind::CommonName,
            RuleKind::Principal | RuleKind::PrincipalRegex => IdentifierKind::Principal,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            RuleKind::DnsRegex
                | RuleKind::EmailRegex
                | RuleKind::UriRegex
                | RuleKind::CommonNameRegex
                | RuleKind::PrincipalRegex
        )
    }

    /// Plural description, as used in "does not support ..." errors.
    pub fn describe(&self) -> &'static str {
        match self {
            RuleKind::Dns => "DNS names",
            RuleKind::DnsRegex => "DNS regex patterns",
            RuleKind::Email => "email addresses",
            RuleKind::EmailRegex => "email regex patterns",
            RuleKind::UriConstraint => "URI constraints",
            RuleKind::UriRegex => "URI regex patterns",
            RuleKind::Ip => "IP ranges",
            RuleKind::CommonName => "common names",
            RuleKind::CommonNameRegex => "common name regex patterns",
            RuleKind::Principal => "principals",
            RuleKind::PrincipalRegex => "principal regex patterns",
        }
    }

    /// All rule kinds that serve `kind`; syntax-derived fields come first.
    pub fn for_identifier(kind: IdentifierKind) -> &'static [RuleKind] {
        match kind {
            IdentifierKind::Dns => DNS_RULES,
            IdentifierKind::Email => EMAIL_RULES,
            IdentifierKind::Uri => URI_RULES,
            IdentifierKind::IpRange => IP_RULES,
            IdentifierKind::CommonName => CN_RULES,
            IdentifierKind::Principal => PRINCIPAL_RULES,
        }
    }
}
