//! Name-constraint policy engine for a certificate authority.
//!
//! A [`PolicyDocument`] holds allow and deny rules for X.509, SSH host and
//! SSH user certificates. [`evaluate`] decides every identifier of a
//! [`CertificateRequest`] against it: deny rules win, then allow rules, then
//! the per-kind default. [`PolicyEngine`] wraps a document in swappable,
//! immutable snapshots for concurrent use.
//!
//! ```rust
//! use sanpolicy_core::{CertificateRequest, Identifier, ListKind, PolicyBranch, PolicyDocument, RuleKind};
//!
//! let mut document = PolicyDocument::new();
//! document.add(PolicyBranch::X509, ListKind::Allow, RuleKind::Dns, "*.example.com").unwrap();
//! document.add(PolicyBranch::X509, ListKind::Deny, RuleKind::Dns, "*.internal.example.com").unwrap();
//!
//! let request = CertificateRequest::x509()
//!     .with_identifier(Identifier::dns("www.example.com"))
//!     .with_identifier(Identifier::dns("db.internal.example.com"));
//! let decision = sanpolicy_core::evaluate(&document, &request).unwrap();
//! assert!(!decision.is_allowed());
//! ```

pub use document::{
    BranchPolicy, PolicyDocument, PolicyEdit, SshPolicy, validate_assignment,
    validate_rule_assignment,
};
pub use engine::{PolicyEngine, PolicySnapshot, PolicyVersion, evaluate, evaluate_one};
pub use error::PolicyError;
pub use loader::{document_from_json, document_to_json, document_to_json_pretty};
pub use pattern::{Pattern, PatternMode};
pub use rules::{RuleList, RuleSet};
pub use types::{
    CertificateRequest, Decision, DecisionReason, Identifier, IdentifierKind, ListKind, Outcome,
    PolicyBranch, RequestDecision, RuleKind,
};
pub use uri::UriConstraint;

mod document;
mod engine;
mod error;
mod loader;
mod pattern;
mod policy_match;
mod report;
mod rules;
mod types;
mod uri;

#[cfg(feature = "observability")]
pub mod metrics;

#[cfg(test)]
mod tests;
