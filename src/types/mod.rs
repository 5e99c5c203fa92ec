//! Data model types for requests, identifiers and decisions.
//!
//! Canonical string forms:
//! - Branch: `x509`, `ssh_host`, `ssh_user` (displayed as `X.509`, `SSH host`, `SSH user`)
//! - Identifier kind: `dns`, `email`, `uri`, `ip_range`, `common_name`, `principal`
//! - Rule kind: the command name that edits the field, e.g. `dns-regex`, `uri-constraint`

mod branch;
mod decision;
mod identifier;
mod request;
mod rule_kind;

pub use branch::{ListKind, PolicyBranch};
pub use decision::{Decision, DecisionReason, Outcome, RequestDecision};
pub use identifier::{Identifier, IdentifierKind};
pub use request::CertificateRequest;
pub use rule_kind::RuleKind;
