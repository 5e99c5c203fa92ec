use crate::document::{PolicyDocument, RawPolicyDocument};
use crate::error::PolicyError;

/// Parse a JSON policy document.
///
/// Invalid JSON or an unknown field is a `PolicyError::ParseError`. The
/// document is then compiled: a malformed pattern is a
/// `PolicyError::Configuration` and a rule or default the branch cannot carry
/// is a `PolicyError::UnsupportedCombination`.
///
/// Example:
/// ```rust
/// use sanpolicy_core::document_from_json;
/// let text = r#"{
///     "x509": { "deny": { "dns": ["*.internal.example.com"] } },
///     "ssh": { "user": { "allow": { "principals": ["alice"] } } }
/// }"#;
/// let document = document_from_json(text).unwrap();
/// assert!(!document.is_empty());
/// ```
pub fn document_from_json(text: &str) -> Result<PolicyDocument, PolicyError> {
    let raw: RawPolicyDocument = serde_json::from_str(text)?;
    PolicyDocument::try_from(raw)
}

/// Serialize a policy document to its canonical, compact JSON form.
pub fn document_to_json(document: &PolicyDocument) -> Result<String, PolicyError> {
    serde_json::to_string(document).map_err(|e| PolicyError::SerializeError(e.to_string()))
}

/// Pretty-printed variant of [`document_to_json`], for writing back to disk.
pub fn document_to_json_pretty(document: &PolicyDocument) -> Result<String, PolicyError> {
    serde_json::to_string_pretty(document).map_err(|e| PolicyError::SerializeError(e.to_string()))
}
