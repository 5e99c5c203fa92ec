use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::document::{PolicyDocument, PolicyEdit};
use crate::error::PolicyError;
use crate::loader;
use crate::policy_match::is_well_formed;
use crate::types::{
    CertificateRequest, Decision, Identifier, ListKind, PolicyBranch, RequestDecision,
};

/// Decide a single identifier against one branch of `document`.
///
/// Deny rules are consulted first, then allow rules, then the branch default
/// for the identifier's kind. Identifiers that cannot be read as their kind
/// are denied without consulting any rule. An identifier whose kind the
/// branch cannot carry is a caller bug and is reported as
/// [`PolicyError::InternalInconsistency`].
pub fn evaluate_one(
    document: &PolicyDocument,
    branch: PolicyBranch,
    identifier: &Identifier,
) -> Result<Decision, PolicyError> {
    let kind = identifier.kind();
    if !branch.supports(kind) {
        error!(
            event = "Evaluate",
            phase = "Legality",
            branch = branch.to_string(),
            kind = kind.to_string(),
            value = identifier.value()
        );
        return Err(PolicyError::InternalInconsistency(format!(
            "{branch} policy cannot evaluate {identifier}"
        )));
    }

    if !is_well_formed(identifier) {
        warn!(
            event = "Evaluate",
            phase = "Malformed",
            branch = branch.to_string(),
            kind = kind.to_string(),
            value = identifier.value()
        );
        return Ok(Decision::malformed(branch, identifier));
    }

    let policy = document.branch(branch);

    if let Some(pattern) = policy.deny().match_any(identifier) {
        info!(
            event = "Evaluate",
            phase = "Deny",
            branch = branch.to_string(),
            kind = kind.to_string(),
            value = identifier.value(),
            rule = pattern.rule().to_string(),
            pattern = pattern.raw()
        );
        return Ok(Decision::matched(branch, identifier, ListKind::Deny, pattern));
    }

    if policy.allow().has_rules_for(kind) {
        let decision = match policy.allow().match_any(identifier) {
            Some(pattern) => Decision::matched(branch, identifier, ListKind::Allow, pattern),
            None => Decision::not_allow_listed(branch, identifier),
        };
        debug!(
            event = "Evaluate",
            phase = "Allow",
            branch = branch.to_string(),
            value = identifier.value(),
            outcome = decision.outcome().to_string(),
            pattern = decision.pattern()
        );
        return Ok(decision);
    }

    let outcome = policy.default_outcome(kind);
    debug!(
        event = "Evaluate",
        phase = "Default",
        branch = branch.to_string(),
        kind = kind.to_string(),
        outcome = outcome.to_string()
    );
    Ok(Decision::unconfigured(branch, identifier, outcome))
}

/// Decide every identifier of `request`. The request is allowed only if all
/// identifiers are; every identifier is evaluated so all denials are reported.
pub fn evaluate(
    document: &PolicyDocument,
    request: &CertificateRequest,
) -> Result<RequestDecision, PolicyError> {
    debug!(
        event = "Request",
        phase = "Evaluation",
        branch = request.branch.to_string(),
        identifiers = request.identifiers.len()
    );

    let decisions = request
        .identifiers
        .iter()
        .map(|identifier| evaluate_one(document, request.branch, identifier))
        .collect::<Result<Vec<_>, _>>()?;
    let combined = RequestDecision::combine(request.branch, decisions);

    debug!(
        event = "Request",
        phase = "Result",
        branch = request.branch.to_string(),
        outcome = combined.outcome().to_string(),
        denials = combined.denials().count()
    );
    Ok(combined)
}

/// Identifies the document a snapshot was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub struct PolicyVersion {
    /// SHA-256 of the document's canonical JSON, hex encoded.
    pub hash: String,
    /// Incremented every time the engine swaps in a changed document.
    pub generation: u64,
}

impl PolicyVersion {
    fn of(document: &PolicyDocument, generation: u64) -> Result<Self, PolicyError> {
        let canonical = loader::document_to_json(document)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(PolicyVersion {
            hash: hex::encode(digest),
            generation,
        })
    }
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} (generation {})", self.hash, self.generation)
    }
}

/// An immutable document together with its version.
#[derive(Debug)]
pub struct PolicySnapshot {
    document: PolicyDocument,
    version: PolicyVersion,
}

impl PolicySnapshot {
    fn new(document: PolicyDocument, generation: u64) -> Result<Self, PolicyError> {
        let version = PolicyVersion::of(&document, generation)?;
        Ok(PolicySnapshot { document, version })
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }

    pub fn evaluate(&self, request: &CertificateRequest) -> Result<RequestDecision, PolicyError> {
        evaluate(&self.document, request)
    }

    pub fn evaluate_one(
        &self,
        branch: PolicyBranch,
        identifier: &Identifier,
    ) -> Result<Decision, PolicyError> {
        evaluate_one(&self.document, branch, identifier)
    }
}

/// The main engine handle. Cloneable and thread-safe.
///
/// Evaluations run against the snapshot current when they start; edits and
/// reloads build a new document and swap it in whole.
#[derive(Clone, Debug)]
pub struct PolicyEngine {
    inner: Arc<RwLock<Arc<PolicySnapshot>>>,
}

impl PolicyEngine {
    pub fn new(document: PolicyDocument) -> Result<Self, PolicyError> {
        let snapshot = PolicySnapshot::new(document, 0)?;
        info!(
            event = "Engine",
            phase = "Created",
            hash = snapshot.version.hash.as_str()
        );
        Ok(PolicyEngine {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    pub fn new_from_str(policy_text: &str) -> Result<Self, PolicyError> {
        Self::new(loader::document_from_json(policy_text)?)
    }

    /// The snapshot is only ever replaced whole, so a lock poisoned by a
    /// panicking edit still guards a consistent value and is recovered.
    fn read_lock(&self) -> RwLockReadGuard<'_, Arc<PolicySnapshot>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!(event = "Engine", phase = "Poisoned", lock = "read");
            self.inner.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Arc<PolicySnapshot>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!(event = "Engine", phase = "Poisoned", lock = "write");
            self.inner.clear_poison();
            poisoned.into_inner()
        })
    }

    pub fn current_snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&*self.read_lock())
    }

    pub fn current_version(&self) -> PolicyVersion {
        self.current_snapshot().version.clone()
    }

    /// A copy of the current document, e.g. for persisting after an edit.
    pub fn document(&self) -> PolicyDocument {
        self.current_snapshot().document.clone()
    }

    pub fn evaluate(&self, request: &CertificateRequest) -> Result<RequestDecision, PolicyError> {
        #[cfg(feature = "observability")]
        let start = std::time::Instant::now();

        let snapshot = self.current_snapshot();
        let result = snapshot.evaluate(request);

        #[cfg(feature = "observability")]
        if let Ok(decision) = &result {
            crate::metrics::record_evaluation(
                decision.is_allowed(),
                start.elapsed(),
                request.branch,
                request.identifiers.len(),
            );
        }

        result
    }

    pub fn evaluate_one(
        &self,
        branch: PolicyBranch,
        identifier: &Identifier,
    ) -> Result<Decision, PolicyError> {
        #[cfg(feature = "observability")]
        let start = std::time::Instant::now();

        let snapshot = self.current_snapshot();
        let result = snapshot.evaluate_one(branch, identifier);

        #[cfg(feature = "observability")]
        if let Ok(decision) = &result {
            crate::metrics::record_evaluation(decision.is_allowed(), start.elapsed(), branch, 1);
        }

        result
    }

    /// Replace the whole document. Reloading an identical document keeps the
    /// current snapshot and version.
    pub fn reload(&self, document: PolicyDocument) -> Result<PolicyVersion, PolicyError> {
        let mut guard = self.write_lock();
        if guard.document == document {
            debug!(event = "Reload", phase = "Unchanged");
            return Ok(guard.version.clone());
        }
        Self::swap(&mut guard, document)
    }

    /// Parse and swap in a JSON document. Errors are those of
    /// [`loader::document_from_json`]; on error the current snapshot stays.
    pub fn reload_from_str(&self, policy_text: &str) -> Result<PolicyVersion, PolicyError> {
        let document = loader::document_from_json(policy_text).inspect_err(|e| {
            warn!(event = "Reload", phase = "Parse", error = e.to_string());
        })?;
        self.reload(document)
    }

    /// Edit a copy of the current document and swap it in if `edit` reports a change.
    ///
    /// Edits are serialized against each other; evaluations keep running on
    /// the previous snapshot until the swap.
    pub fn update<F>(&self, edit: F) -> Result<bool, PolicyError>
    where
        F: FnOnce(&mut PolicyDocument) -> Result<bool, PolicyError>,
    {
        let mut guard = self.write_lock();
        let mut document = guard.document.clone();
        if !edit(&mut document)? {
            debug!(event = "Update", phase = "Unchanged");
            return Ok(false);
        }
        Self::swap(&mut guard, document)?;
        Ok(true)
    }

    pub fn apply(&self, edit: &PolicyEdit) -> Result<bool, PolicyError> {
        self.update(|document| document.apply(edit))
    }

    fn swap(
        current: &mut Arc<PolicySnapshot>,
        document: PolicyDocument,
    ) -> Result<PolicyVersion, PolicyError> {
        let snapshot = PolicySnapshot::new(document, current.version.generation + 1)?;
        let version = snapshot.version.clone();
        *current = Arc::new(snapshot);

        info!(
            event = "Reload",
            phase = "Swapped",
            hash = version.hash.as_str(),
            generation = version.generation
        );

        #[cfg(feature = "observability")]
        crate::metrics::record_reload(version.generation);

        Ok(version)
    }
}

#[cfg(test)]
mod tests;
