//! Allow/deny decisions with the rule that produced them.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::{Identifier, IdentifierKind, ListKind, PolicyBranch, RuleKind};
use crate::pattern::Pattern;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
}

/// Why an identifier ended up with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// A deny pattern matched.
    DeniedByPattern,
    /// An allow pattern matched and no deny pattern did.
    AllowedByPattern,
    /// Allow patterns exist for the kind but none matched.
    NotAllowListed,
    /// No allow patterns exist for the kind; the branch default applied.
    Unconfigured,
    /// The identifier could not be interpreted as its kind.
    MalformedIdentifier,
}

/// Decision for one identifier. Built by the engine, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    outcome: Outcome,
    reason: DecisionReason,
    branch: PolicyBranch,
    kind: IdentifierKind,
    identifier: String,
    list: Option<ListKind>,
    rule: Option<RuleKind>,
    pattern: Option<String>,
}

impl Decision {
    pub(crate) fn matched(
        branch: PolicyBranch,
        identifier: &Identifier,
        list: ListKind,
        pattern: &Pattern,
    ) -> Self {
        let (outcome, reason) = match list {
            ListKind::Deny => (Outcome::Deny, DecisionReason::DeniedByPattern),
            ListKind::Allow => (Outcome::Allow, DecisionReason::AllowedByPattern),
        };
        Decision {
            outcome,
            reason,
            branch,
            kind: identifier.kind(),
            identifier: identifier.value().to_string(),
            list: Some(list),
            rule: Some(pattern.rule()),
            pattern: Some(pattern.raw().to_string()),
        }
    }

    pub(crate) fn not_allow_listed(branch: PolicyBranch, identifier: &Identifier) -> Self {
        Self::unmatched(
            branch,
            identifier,
            Outcome::Deny,
            DecisionReason::NotAllowListed,
            Some(ListKind::Allow),
        )
    }

    pub(crate) fn unconfigured(
        branch: PolicyBranch,
        identifier: &Identifier,
        outcome: Outcome,
    ) -> Self {
        Self::unmatched(branch, identifier, outcome, DecisionReason::Unconfigured, None)
    }

    pub(crate) fn malformed(branch: PolicyBranch, identifier: &Identifier) -> Self {
        Self::unmatched(
            branch,
            identifier,
            Outcome::Deny,
            DecisionReason::MalformedIdentifier,
            None,
        )
    }

    fn unmatched(
        branch: PolicyBranch,
        identifier: &Identifier,
        outcome: Outcome,
        reason: DecisionReason,
        list: Option<ListKind>,
    ) -> Self {
        Decision {
            outcome,
            reason,
            branch,
            kind: identifier.kind(),
            identifier: identifier.value().to_string(),
            list,
            rule: None,
            pattern: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }

    pub fn reason(&self) -> DecisionReason {
        self.reason
    }

    pub fn branch(&self) -> PolicyBranch {
        self.branch
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The list that decided the outcome; `None` when a default applied.
    pub fn list(&self) -> Option<ListKind> {
        self.list
    }

    pub fn rule(&self) -> Option<RuleKind> {
        self.rule
    }

    /// Raw text of the matched pattern, if a pattern decided the outcome.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}

/// Combined decision for every identifier of one certificate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestDecision {
    outcome: Outcome,
    branch: PolicyBranch,
    decisions: Vec<Decision>,
}

impl RequestDecision {
    /// Allowed only if every identifier is allowed.
    pub(crate) fn combine(branch: PolicyBranch, decisions: Vec<Decision>) -> Self {
        let outcome = if decisions.iter().all(Decision::is_allowed) {
            Outcome::Allow
        } else {
            Outcome::Deny
        };
        RequestDecision {
            outcome,
            branch,
            decisions,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }

    pub fn branch(&self) -> PolicyBranch {
        self.branch
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn denials(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| !d.is_allowed())
    }

    pub fn first_denial(&self) -> Option<&Decision> {
        self.denials().next()
    }
}
