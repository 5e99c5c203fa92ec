use std::sync::Arc;

use super::*;
use crate::types::{DecisionReason, IdentifierKind, Outcome, RuleKind};
use yare::parameterized;


const TEST_POLICY: &str = r#"{
    "x509": {
        "allow": {
            "dns": ["*.example.com"],
            "emails": ["@example.com"],
            "uriConstraints": ["https://api.example.com/api/*"],
            "ips": ["10.0.0.0/8"]
        },
        "deny": {
            "dns": ["*.internal.example.com"],
            "dnsRegex": ["^admin\\."],
            "uriConstraints": ["http://"],
            "ips": ["10.66.0.0/16"]
        }
    },
    "ssh": {
        "host": {
            "allow": { "dns": ["*.hosts.example.com"] },
            "deny": { "principals": ["localhost"] }
        },
        "user": {
            "allow": { "principalRegex": ["^[a-z][a-z0-9_-]*$"] },
            "deny": { "principals": ["root"], "emailRegex": ["@contractor\\."] }
        }
    }
}"#;

const TEST_POLICY_DENY_ONLY: &str = r#"{
    "x509": { "deny": { "dns": ["*.internal.example.com"] } }
}"#;

const TEST_POLICY_DENY_SECRETS: &str = r#"{
    "x509": {
        "deny": {
            "dns": ["*.internal.example.com", "secret.example.com"],
            "emails": ["@secret.example.com"],
            "uriConstraints": ["secret.example.com"],
            "uriRegex": ["^https://vault\\.example\\.com/"],
            "ips": ["10.0.0.0/8"]
        }
    }
}"#;

const TEST_POLICY_BOTH_LISTS: &str = r#"{
    "x509": {
        "allow": { "dns": ["secret.example.com"] },
        "deny": { "dns": ["secret.example.com"] }
    }
}"#;

#[derive(Clone)]
struct SharedLogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

struct SharedLogWriter(Arc<std::sync::Mutex<Vec<u8>>>);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogBuffer {
    type Writer = SharedLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriter(Arc::clone(&self.0))
    }
}

impl std::io::Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a debug-level subscriber on this thread and return what it logged.
fn capture_logs<F: FnOnce()>(f: F) -> String {
    let sink = SharedLogBuffer(Arc::new(std::sync::Mutex::new(Vec::new())));
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(sink.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let logs = sink.0.lock().unwrap().clone();
    String::from_utf8(logs).unwrap()
}

fn engine_from_policy(policy_text: &str) -> PolicyEngine {
    PolicyEngine::new_from_str(policy_text).expect("policy should load")
}

fn document_from_policy(policy_text: &str) -> PolicyDocument {
    loader::document_from_json(policy_text).expect("policy should parse")
}

fn x509_request(names: &[&str]) -> CertificateRequest {
    CertificateRequest::x509().with_identifiers(names.iter().map(|name| Identifier::dns(*name)))
}

fn assert_allow(decision: &Decision) {
    assert_eq!(decision.outcome(), Outcome::Allow, "{decision}");
}

fn assert_deny(decision: &Decision) {
    assert_eq!(decision.outcome(), Outcome::Deny, "{decision}");
}

include!("evaluate.rs");
include!("legality.rs");
