//! Human readable rendering of decisions, for audit logs and CLI errors.

use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::types::{Decision, DecisionReason, Outcome, RequestDecision};

fn verb(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Allow => "allowed",
        Outcome::Deny => "denied",
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} policy {} {} {:?}: ",
            self.branch(),
            verb(self.outcome()),
            self.kind(),
            self.identifier()
        )?;
        match (self.reason(), self.list(), self.rule(), self.pattern()) {
            (
                DecisionReason::DeniedByPattern | DecisionReason::AllowedByPattern,
                Some(list),
                Some(rule),
                Some(pattern),
            ) => write!(f, "matches {list} {rule} pattern {pattern:?}"),
            (DecisionReason::NotAllowListed, ..) => f.write_str("no allow pattern matches"),
            (DecisionReason::Unconfigured, ..) => f.write_str("no allow patterns configured"),
            (DecisionReason::MalformedIdentifier, ..) => f.write_str("identifier is malformed"),
            (DecisionReason::DeniedByPattern | DecisionReason::AllowedByPattern, ..) => {
                f.write_str("matched a pattern")
            }
        }
    }
}

impl Display for RequestDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.outcome() {
            Outcome::Allow => write!(
                f,
                "{} request allowed ({} identifiers)",
                self.branch(),
                self.decisions().len()
            ),
            Outcome::Deny => write!(
                f,
                "{} request denied: {}",
                self.branch(),
                self.denials().join("; ")
            ),
        }
    }
}
