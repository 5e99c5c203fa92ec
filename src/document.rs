//! The policy document: three branches, each with an allow and a deny rule set.
//!
//! Every edit goes through the legality table in [`PolicyBranch::supports`]
//! before anything is mutated, so a document never holds rules the engine
//! could not evaluate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PolicyError;
use crate::pattern::Pattern;
use crate::rules::{RawRuleSet, RuleSet};
use crate::types::{IdentifierKind, ListKind, Outcome, PolicyBranch, RuleKind};

/// Rejects identifier kinds the branch cannot carry.
pub fn validate_assignment(branch: PolicyBranch, kind: IdentifierKind) -> Result<(), PolicyError> {
    if branch.supports(kind) {
        Ok(())
    } else {
        Err(PolicyError::UnsupportedCombination {
            branch,
            subject: kind.describe().to_string(),
        })
    }
}

/// Like [`validate_assignment`], with the error naming the rule field.
pub fn validate_rule_assignment(branch: PolicyBranch, rule: RuleKind) -> Result<(), PolicyError> {
    if branch.supports(rule.identifier_kind()) {
        Ok(())
    } else {
        Err(PolicyError::UnsupportedCombination {
            branch,
            subject: rule.describe().to_string(),
        })
    }
}

/// Allow and deny rules of one branch, plus the per-kind fallback outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchPolicy {
    #[serde(default, skip_serializing_if = "RuleSet::is_empty")]
    allow: RuleSet,
    #[serde(default, skip_serializing_if = "RuleSet::is_empty")]
    deny: RuleSet,
    /// Outcome for kinds without allow rules. Only `deny` entries are stored.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    defaults: BTreeMap<IdentifierKind, Outcome>,
}

impl BranchPolicy {
    pub fn allow(&self) -> &RuleSet {
        &self.allow
    }

    pub fn deny(&self) -> &RuleSet {
        &self.deny
    }

    pub fn rules(&self, list: ListKind) -> &RuleSet {
        match list {
            ListKind::Allow => &self.allow,
            ListKind::Deny => &self.deny,
        }
    }

    fn rules_mut(&mut self, list: ListKind) -> &mut RuleSet {
        match list {
            ListKind::Allow => &mut self.allow,
            ListKind::Deny => &mut self.deny,
        }
    }

    /// Outcome applied when no allow rule exists for `kind`. Defaults to allow.
    pub fn default_outcome(&self, kind: IdentifierKind) -> Outcome {
        self.defaults.get(&kind).copied().unwrap_or(Outcome::Allow)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (IdentifierKind, Outcome)> + '_ {
        self.defaults.iter().map(|(kind, outcome)| (*kind, *outcome))
    }

    fn set_default_outcome(&mut self, kind: IdentifierKind, outcome: Outcome) -> bool {
        let previous = match outcome {
            Outcome::Allow => self.defaults.remove(&kind),
            Outcome::Deny => self.defaults.insert(kind, outcome),
        };
        previous.unwrap_or(Outcome::Allow) != outcome
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty() && self.defaults.is_empty()
    }

    fn validate(&self, branch: PolicyBranch) -> Result<(), PolicyError> {
        for list in [ListKind::Allow, ListKind::Deny] {
            for rule in self.rules(list).configured_rules() {
                validate_rule_assignment(branch, rule)?;
            }
        }
        for kind in self.defaults.keys() {
            validate_assignment(branch, *kind)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshPolicy {
    #[serde(default, skip_serializing_if = "BranchPolicy::is_empty")]
    host: BranchPolicy,
    #[serde(default, skip_serializing_if = "BranchPolicy::is_empty")]
    user: BranchPolicy,
}

impl SshPolicy {
    pub fn host(&self) -> &BranchPolicy {
        &self.host
    }

    pub fn user(&self) -> &BranchPolicy {
        &self.user
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.user.is_empty()
    }
}

/// The complete policy a CA enforces.
///
/// Deserializing a document compiles every pattern and checks legality, so
/// a value of this type is always evaluable. Through plain serde those
/// failures surface as the deserializer's error; [`crate::document_from_json`]
/// keeps them typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicyDocument")]
pub struct PolicyDocument {
    #[serde(skip_serializing_if = "BranchPolicy::is_empty")]
    x509: BranchPolicy,
    #[serde(skip_serializing_if = "SshPolicy::is_empty")]
    ssh: SshPolicy,
}

impl PolicyDocument {
    pub fn new() -> Self {
        PolicyDocument::default()
    }

    pub fn x509(&self) -> &BranchPolicy {
        &self.x509
    }

    pub fn ssh(&self) -> &SshPolicy {
        &self.ssh
    }

    pub fn branch(&self, branch: PolicyBranch) -> &BranchPolicy {
        match branch {
            PolicyBranch::X509 => &self.x509,
            PolicyBranch::SshHost => &self.ssh.host,
            PolicyBranch::SshUser => &self.ssh.user,
        }
    }

    fn branch_mut(&mut self, branch: PolicyBranch) -> &mut BranchPolicy {
        match branch {
            PolicyBranch::X509 => &mut self.x509,
            PolicyBranch::SshHost => &mut self.ssh.host,
            PolicyBranch::SshUser => &mut self.ssh.user,
        }
    }

    /// Adds one pattern. Returns `Ok(false)` if it was already present.
    pub fn add(
        &mut self,
        branch: PolicyBranch,
        list: ListKind,
        rule: RuleKind,
        raw: &str,
    ) -> Result<bool, PolicyError> {
        validate_rule_assignment(branch, rule)?;
        self.branch_mut(branch).rules_mut(list).add(rule, raw)
    }

    /// Removes one pattern. Returns `Ok(false)` if it was not present.
    pub fn remove(
        &mut self,
        branch: PolicyBranch,
        list: ListKind,
        rule: RuleKind,
        raw: &str,
    ) -> Result<bool, PolicyError> {
        validate_rule_assignment(branch, rule)?;
        Ok(self.branch_mut(branch).rules_mut(list).remove(rule, raw))
    }

    pub fn contains(&self, branch: PolicyBranch, list: ListKind, rule: RuleKind, raw: &str) -> bool {
        self.branch(branch).rules(list).contains(rule, raw)
    }

    /// Applies a multi-value edit atomically.
    ///
    /// Legality is checked first and every added value is compiled before the
    /// document is touched; on error the document is unchanged.
    pub fn apply(&mut self, edit: &PolicyEdit) -> Result<bool, PolicyError> {
        validate_rule_assignment(edit.branch, edit.rule)?;
        let rules = self.branch_mut(edit.branch).rules_mut(edit.list);

        if edit.remove {
            return Ok(edit
                .values
                .iter()
                .fold(false, |changed, raw| rules.remove(edit.rule, raw) | changed));
        }

        let patterns = edit
            .values
            .iter()
            .map(|raw| Pattern::new(edit.rule, raw.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patterns
            .into_iter()
            .fold(false, |changed, pattern| rules.add_pattern(pattern) | changed))
    }

    /// Sets the fallback outcome for `kind` on `branch`.
    pub fn set_default_outcome(
        &mut self,
        branch: PolicyBranch,
        kind: IdentifierKind,
        outcome: Outcome,
    ) -> Result<bool, PolicyError> {
        validate_assignment(branch, kind)?;
        Ok(self.branch_mut(branch).set_default_outcome(kind, outcome))
    }

    /// Re-checks legality of every configured list and default.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.x509.validate(PolicyBranch::X509)?;
        self.ssh.host.validate(PolicyBranch::SshHost)?;
        self.ssh.user.validate(PolicyBranch::SshUser)
    }

    pub fn is_empty(&self) -> bool {
        self.x509.is_empty() && self.ssh.is_empty()
    }
}

/// Wire shape of a [`BranchPolicy`] before its patterns are compiled.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawBranchPolicy {
    allow: RawRuleSet,
    deny: RawRuleSet,
    defaults: BTreeMap<IdentifierKind, Outcome>,
}

impl RawBranchPolicy {
    /// Legality is checked before any pattern is compiled, as for edits.
    fn compile(self, branch: PolicyBranch) -> Result<BranchPolicy, PolicyError> {
        for rule in self.allow.configured_rules().chain(self.deny.configured_rules()) {
            validate_rule_assignment(branch, rule)?;
        }
        for kind in self.defaults.keys() {
            validate_assignment(branch, *kind)?;
        }
        Ok(BranchPolicy {
            allow: RuleSet::try_from(self.allow)?,
            deny: RuleSet::try_from(self.deny)?,
            // `allow` is implied by absence; storing it would fork the canonical form.
            defaults: self
                .defaults
                .into_iter()
                .filter(|(_, outcome)| *outcome == Outcome::Deny)
                .collect(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawSshPolicy {
    host: RawBranchPolicy,
    user: RawBranchPolicy,
}

/// Wire shape of a [`PolicyDocument`], as parsed before compilation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawPolicyDocument {
    x509: RawBranchPolicy,
    ssh: RawSshPolicy,
}

impl TryFrom<RawPolicyDocument> for PolicyDocument {
    type Error = PolicyError;

    fn try_from(raw: RawPolicyDocument) -> Result<Self, Self::Error> {
        Ok(PolicyDocument {
            x509: raw.x509.compile(PolicyBranch::X509)?,
            ssh: SshPolicy {
                host: raw.ssh.host.compile(PolicyBranch::SshHost)?,
                user: raw.ssh.user.compile(PolicyBranch::SshUser)?,
            },
        })
    }
}

/// One administrative edit: several values added to, or removed from, one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PolicyEdit {
    pub branch: PolicyBranch,
    pub list: ListKind,
    pub rule: RuleKind,
    pub values: Vec<String>,
    #[serde(default)]
    pub remove: bool,
}

impl PolicyEdit {
    pub fn add<I, S>(branch: PolicyBranch, list: ListKind, rule: RuleKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PolicyEdit {
            branch,
            list,
            rule,
            values: values.into_iter().map(Into::into).collect(),
            remove: false,
        }
    }

    pub fn remove<I, S>(branch: PolicyBranch, list: ListKind, rule: RuleKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PolicyEdit {
            remove: true,
            ..PolicyEdit::add(branch, list, rule, values)
        }
    }
}
