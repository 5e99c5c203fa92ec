//! Configured match rules.
//!
//! A [`Pattern`] is built from the raw string an operator configured plus the
//! [`RuleKind`] field it was added to. The match mode is derived from that
//! pair once, at construction, and the compiled matcher is kept alongside the
//! raw text. Malformed patterns are rejected here, so matching never fails.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};

use ipnetwork::IpNetwork;
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use strum_macros::Display as StrumDisplay;
use url::Url;

use crate::error::PolicyError;
use crate::policy_match::{
    dns_literal_match, email_domain_match, email_literal_match, exact_match, network_match,
    parse_network, regex_match, subdomain_match,
};
use crate::types::{Identifier, RuleKind};
use crate::uri::UriConstraint;

/// Upper bound on the compiled size of a configured regex.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum PatternMode {
    Literal,
    Wildcard,
    Structured,
    Regex,
}

#[derive(Debug, Clone)]
enum Matcher {
    DnsName(String),
    /// `.example.com` for a configured `*.example.com`.
    DnsWildcard(String),
    EmailAddress(String),
    /// `@example.com`.
    EmailDomain(String),
    Uri(UriConstraint),
    Network(IpNetwork),
    Exact(String),
    Regex(Regex),
}

/// A single configured rule entry. Equality is by rule kind and raw text.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    rule: RuleKind,
    matcher: Matcher,
}

impl Pattern {
    pub fn new(rule: RuleKind, raw: impl Into<String>) -> Result<Self, PolicyError> {
        let raw = raw.into();
        let matcher = compile(rule, &raw)?;
        Ok(Pattern { raw, rule, matcher })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn mode(&self) -> PatternMode {
        match self.matcher {
            Matcher::DnsWildcard(_) | Matcher::EmailDomain(_) => PatternMode::Wildcard,
            Matcher::Uri(_) => PatternMode::Structured,
            Matcher::Regex(_) => PatternMode::Regex,
            Matcher::DnsName(_)
            | Matcher::EmailAddress(_)
            | Matcher::Network(_)
            | Matcher::Exact(_) => PatternMode::Literal,
        }
    }

    /// Whether `identifier` satisfies this pattern. Identifiers of another kind never match.
    pub fn matches(&self, identifier: &Identifier) -> bool {
        if identifier.kind() != self.rule.identifier_kind() {
            return false;
        }
        let value = identifier.value();
        match &self.matcher {
            Matcher::DnsName(name) => dns_literal_match(name, value),
            Matcher::DnsWildcard(suffix) => subdomain_match(suffix, value),
            Matcher::EmailAddress(address) => email_literal_match(address, value),
            Matcher::EmailDomain(domain) => email_domain_match(domain, value),
            Matcher::Uri(constraint) => constraint.matches(value),
            Matcher::Network(network) => network_match(network, value),
            Matcher::Exact(expected) => exact_match(expected, value),
            // Scheme and host case or an explicit default port must not dodge a URI regex.
            Matcher::Regex(re) if self.rule == RuleKind::UriRegex => {
                Url::parse(value).is_ok_and(|url| regex_match(re, url.as_str()))
            }
            Matcher::Regex(re) => regex_match(re, value),
        }
    }
}

fn compile(rule: RuleKind, raw: &str) -> Result<Matcher, PolicyError> {
    if raw.is_empty() {
        return Err(PolicyError::configuration(rule, raw, "pattern is empty"));
    }
    if rule.is_regex() {
        return RegexBuilder::new(raw)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map(Matcher::Regex)
            .map_err(|e| PolicyError::configuration(rule, raw, e.to_string()));
    }

    let invalid = |reason: &str| PolicyError::configuration(rule, raw, reason);
    if matches!(rule, RuleKind::Dns | RuleKind::Email | RuleKind::Ip)
        && raw.chars().any(char::is_whitespace)
    {
        return Err(invalid("pattern contains whitespace"));
    }

    match rule {
        RuleKind::Dns => {
            if let Some(rest) = raw.strip_prefix("*.") {
                if rest.is_empty() || rest.contains('*') || rest.starts_with('.') {
                    return Err(invalid("wildcard must be a single leading *. label"));
                }
                Ok(Matcher::DnsWildcard(format!(".{}", rest.to_ascii_lowercase())))
            } else if raw.contains('*') {
                Err(invalid("wildcard must be a single leading *. label"))
            } else {
                Ok(Matcher::DnsName(raw.to_ascii_lowercase()))
            }
        }
        RuleKind::Email => match raw.rsplit_once('@') {
            Some(("", domain)) if !domain.is_empty() => {
                Ok(Matcher::EmailDomain(format!("@{}", domain.to_ascii_lowercase())))
            }
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Matcher::EmailAddress(raw.to_ascii_lowercase()))
            }
            _ => Err(invalid("expected an address or an @domain")),
        },
        RuleKind::UriConstraint => UriConstraint::parse(raw).map(Matcher::Uri),
        RuleKind::Ip => parse_network(raw)
            .map(Matcher::Network)
            .ok_or_else(|| invalid("expected an IP address or CIDR range")),
        RuleKind::CommonName | RuleKind::Principal => Ok(Matcher::Exact(raw.to_string())),
        RuleKind::DnsRegex
        | RuleKind::EmailRegex
        | RuleKind::UriRegex
        | RuleKind::CommonNameRegex
        | RuleKind::PrincipalRegex => Err(PolicyError::InternalInconsistency(format!(
            "{rule} is a regex rule but was compiled as a literal"
        ))),
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule && self.raw == other.raw
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule.hash(state);
        self.raw.hash(state);
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {:?}", self.rule, self.raw)
    }
}

impl Serialize for Pattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}
