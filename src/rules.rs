//! Ordered, duplicate-free pattern lists and the per-side rule set.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::pattern::Pattern;
use crate::types::{Identifier, IdentifierKind, RuleKind};

/// Patterns for one (branch, allow|deny, rule kind) cell, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleList {
    patterns: Vec<Pattern>,
}

impl RuleList {
    /// Appends `pattern` unless an equal one is present. Returns whether the list changed.
    pub fn add(&mut self, pattern: Pattern) -> bool {
        if self.patterns.contains(&pattern) {
            return false;
        }
        self.patterns.push(pattern);
        true
    }

    /// Removes the pattern with this raw text. Absent values are a no-op.
    pub fn remove(&mut self, raw: &str) -> bool {
        let before = self.patterns.len();
        self.patterns.retain(|p| p.raw() != raw);
        self.patterns.len() != before
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.patterns.iter().any(|p| p.raw() == raw)
    }

    pub fn first_match(&self, identifier: &Identifier) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.matches(identifier))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn raw_values(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::raw).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn compile(rule: RuleKind, values: Vec<String>) -> Result<Self, PolicyError> {
        let mut list = RuleList::default();
        for raw in values {
            list.add(Pattern::new(rule, raw)?);
        }
        Ok(list)
    }
}

/// Every pattern field of one side (allow or deny) of a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRuleSet")]
pub struct RuleSet {
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    dns: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    dns_regex: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    emails: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    email_regex: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    uri_constraints: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    uri_regex: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    ips: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    common_names: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    cn_regex: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    principals: RuleList,
    #[serde(skip_serializing_if = "RuleList::is_empty")]
    principal_regex: RuleList,
}

impl RuleSet {
    pub fn list(&self, rule: RuleKind) -> &RuleList {
        match rule {
            RuleKind::Dns => &self.dns,
            RuleKind::DnsRegex => &self.dns_regex,
            RuleKind::Email => &self.emails,
            RuleKind::EmailRegex => &self.email_regex,
            RuleKind::UriConstraint => &self.uri_constraints,
            RuleKind::UriRegex => &self.uri_regex,
            RuleKind::Ip => &self.ips,
            RuleKind::CommonName => &self.common_names,
            RuleKind::CommonNameRegex => &self.cn_regex,
            RuleKind::Principal => &self.principals,
            RuleKind::PrincipalRegex => &self.principal_regex,
        }
    }

    fn list_mut(&mut self, rule: RuleKind) -> &mut RuleList {
        match rule {
            RuleKind::Dns => &mut self.dns,
            RuleKind::DnsRegex => &mut self.dns_regex,
            RuleKind::Email => &mut self.emails,
            RuleKind::EmailRegex => &mut self.email_regex,
            RuleKind::UriConstraint => &mut self.uri_constraints,
            RuleKind::UriRegex => &mut self.uri_regex,
            RuleKind::Ip => &mut self.ips,
            RuleKind::CommonName => &mut self.common_names,
            RuleKind::CommonNameRegex => &mut self.cn_regex,
            RuleKind::Principal => &mut self.principals,
            RuleKind::PrincipalRegex => &mut self.principal_regex,
        }
    }

    /// Compiles `raw` and appends it to the `rule` list.
    ///
    /// Malformed patterns fail with [`PolicyError::Configuration`] and leave the set untouched;
    /// adding a value that is already present returns `Ok(false)`.
    pub fn add(&mut self, rule: RuleKind, raw: &str) -> Result<bool, PolicyError> {
        if self.contains(rule, raw) {
            return Ok(false);
        }
        let pattern = Pattern::new(rule, raw)?;
        Ok(self.list_mut(rule).add(pattern))
    }

    pub(crate) fn add_pattern(&mut self, pattern: Pattern) -> bool {
        self.list_mut(pattern.rule()).add(pattern)
    }

    pub fn remove(&mut self, rule: RuleKind, raw: &str) -> bool {
        self.list_mut(rule).remove(raw)
    }

    pub fn contains(&self, rule: RuleKind, raw: &str) -> bool {
        self.list(rule).contains(raw)
    }

    /// First pattern, over every field serving the identifier's kind, that matches it.
    pub fn match_any(&self, identifier: &Identifier) -> Option<&Pattern> {
        RuleKind::for_identifier(identifier.kind())
            .iter()
            .find_map(|rule| self.list(*rule).first_match(identifier))
    }

    /// Whether any field serving `kind` holds a pattern.
    pub fn has_rules_for(&self, kind: IdentifierKind) -> bool {
        RuleKind::for_identifier(kind)
            .iter()
            .any(|rule| !self.list(*rule).is_empty())
    }

    /// Rule kinds that currently hold at least one pattern.
    pub fn configured_rules(&self) -> impl Iterator<Item = RuleKind> + '_ {
        use strum::IntoEnumIterator;
        RuleKind::iter().filter(|rule| !self.list(*rule).is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.configured_rules().next().is_none()
    }
}

/// Wire shape of a [`RuleSet`] before its patterns are compiled.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub(crate) struct RawRuleSet {
    dns: Vec<String>,
    dns_regex: Vec<String>,
    emails: Vec<String>,
    email_regex: Vec<String>,
    uri_constraints: Vec<String>,
    uri_regex: Vec<String>,
    ips: Vec<String>,
    common_names: Vec<String>,
    cn_regex: Vec<String>,
    principals: Vec<String>,
    principal_regex: Vec<String>,
}

impl RawRuleSet {
    /// Rule kinds with at least one configured value.
    pub(crate) fn configured_rules(&self) -> impl Iterator<Item = RuleKind> + '_ {
        use strum::IntoEnumIterator;
        RuleKind::iter().filter(|rule| !self.values(*rule).is_empty())
    }

    fn values(&self, rule: RuleKind) -> &[String] {
        match rule {
            RuleKind::Dns => &self.dns,
            RuleKind::DnsRegex => &self.dns_regex,
            RuleKind::Email => &self.emails,
            RuleKind::EmailRegex => &self.email_regex,
            RuleKind::UriConstraint => &self.uri_constraints,
            RuleKind::UriRegex => &self.uri_regex,
            RuleKind::Ip => &self.ips,
            RuleKind::CommonName => &self.common_names,
            RuleKind::CommonNameRegex => &self.cn_regex,
            RuleKind::Principal => &self.principals,
            RuleKind::PrincipalRegex => &self.principal_regex,
        }
    }
}

impl TryFrom<RawRuleSet> for RuleSet {
    type Error = PolicyError;

    fn try_from(raw: RawRuleSet) -> Result<Self, Self::Error> {
        Ok(RuleSet {
            dns: RuleList::compile(RuleKind::Dns, raw.dns)?,
            dns_regex: RuleList::compile(RuleKind::DnsRegex, raw.dns_regex)?,
            emails: RuleList::compile(RuleKind::Email, raw.emails)?,
            email_regex: RuleList::compile(RuleKind::EmailRegex, raw.email_regex)?,
            uri_constraints: RuleList::compile(RuleKind::UriConstraint, raw.uri_constraints)?,
            uri_regex: RuleList::compile(RuleKind::UriRegex, raw.uri_regex)?,
            ips: RuleList::compile(RuleKind::Ip, raw.ips)?,
            common_names: RuleList::compile(RuleKind::CommonName, raw.common_names)?,
            cn_regex: RuleList::compile(RuleKind::CommonNameRegex, raw.cn_regex)?,
            principals: RuleList::compile(RuleKind::Principal, raw.principals)?,
            principal_regex: RuleList::compile(RuleKind::PrincipalRegex, raw.principal_regex)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut rules = RuleSet::default();
        assert!(rules.add(RuleKind::Dns, "*.example.com").unwrap());
        assert!(!rules.add(RuleKind::Dns, "*.example.com").unwrap());
        assert_eq!(rules.list(RuleKind::Dns).len(), 1);
    }

    #[test]
    fn test_add_is_case_sensitive_on_raw() {
        let mut rules = RuleSet::default();
        assert!(rules.add(RuleKind::Dns, "example.com").unwrap());
        assert!(rules.add(RuleKind::Dns, "Example.com").unwrap());
        assert_eq!(
            rules.list(RuleKind::Dns).raw_values(),
            vec!["example.com", "Example.com"]
        );
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut rules = RuleSet::default();
        rules.add(RuleKind::Principal, "root").unwrap();
        let before = rules.clone();
        assert!(!rules.remove(RuleKind::Principal, "admin"));
        assert!(!rules.remove(RuleKind::PrincipalRegex, "root"));
        assert_eq!(rules, before);
        assert!(rules.remove(RuleKind::Principal, "root"));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_malformed_add_leaves_set_unchanged() {
        let mut rules = RuleSet::default();
        rules.add(RuleKind::DnsRegex, "^ok$").unwrap();
        let before = rules.clone();
        let err = rules.add(RuleKind::DnsRegex, "^(broken").unwrap_err();
        assert!(matches!(err, PolicyError::Configuration { .. }));
        assert_eq!(rules, before);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut rules = RuleSet::default();
        for raw in ["c.example.com", "a.example.com", "b.example.com"] {
            rules.add(RuleKind::Dns, raw).unwrap();
        }
        rules.remove(RuleKind::Dns, "a.example.com");
        rules.add(RuleKind::Dns, "a.example.com").unwrap();
        assert_eq!(
            rules.list(RuleKind::Dns).raw_values(),
            vec!["c.example.com", "b.example.com", "a.example.com"]
        );
    }

    #[test]
    fn test_match_any_consults_literal_and_regex_fields() {
        let mut rules = RuleSet::default();
        rules.add(RuleKind::Dns, "www.example.com").unwrap();
        rules.add(RuleKind::DnsRegex, r"^prod-.*\.example\.com$").unwrap();
        rules.add(RuleKind::CommonName, "prod-1.example.com").unwrap();

        let literal = rules.match_any(&Identifier::dns("WWW.example.com")).unwrap();
        assert_eq!(literal.rule(), RuleKind::Dns);

        let regex = rules.match_any(&Identifier::dns("prod-1.example.com")).unwrap();
        assert_eq!(regex.rule(), RuleKind::DnsRegex);

        assert!(rules.match_any(&Identifier::dns("dev-1.example.com")).is_none());
    }

    #[test]
    fn test_has_rules_for() {
        let mut rules = RuleSet::default();
        assert!(!rules.has_rules_for(IdentifierKind::Uri));
        rules.add(RuleKind::UriRegex, "^spiffe://").unwrap();
        assert!(rules.has_rules_for(IdentifierKind::Uri));
        assert!(!rules.has_rules_for(IdentifierKind::Dns));
        assert_eq!(
            rules.configured_rules().collect::<Vec<_>>(),
            vec![RuleKind::UriRegex]
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_order_and_omits_empty() {
        let mut rules = RuleSet::default();
        rules.add(RuleKind::Dns, "b.example.com").unwrap();
        rules.add(RuleKind::Dns, "a.example.com").unwrap();
        rules.add(RuleKind::CommonNameRegex, "^test-.*$").unwrap();

        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dns": ["b.example.com", "a.example.com"],
                "cnRegex": ["^test-.*$"],
            })
        );

        let back: RuleSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_deserialize_rejects_bad_pattern() {
        let result: Result<RuleSet, _> =
            serde_json::from_value(serde_json::json!({"uriConstraints": ["example.com/x"]}));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("uri-constraint"));
    }

    #[test]
    fn test_deserialize_collapses_duplicates() {
        let rules: RuleSet =
            serde_json::from_value(serde_json::json!({"principals": ["root", "root"]})).unwrap();
        assert_eq!(rules.list(RuleKind::Principal).len(), 1);
    }
}
