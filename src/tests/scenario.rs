//! End-to-end checks against the fixture in `testdata/policy.json`.

use yare::parameterized;

use crate::{
    CertificateRequest, DecisionReason, Identifier, ListKind, Outcome, PolicyBranch,
    PolicyDocument, PolicyEdit, PolicyEngine, RuleKind, document_from_json, document_to_json,
};

const POLICY: &str = include_str!("../../testdata/policy.json");

fn init_engine() -> PolicyEngine {
    PolicyEngine::new_from_str(POLICY).unwrap()
}

fn document() -> PolicyDocument {
    document_from_json(POLICY).unwrap()
}

#[test]
fn test_fixture_round_trips() {
    let document = document();
    let json = document_to_json(&document).unwrap();
    assert_eq!(document_from_json(&json).unwrap(), document);
}

#[parameterized(
    corp_host = { Identifier::dns("git.corp.example.com"), Outcome::Allow },
    internal_host = { Identifier::dns("vault.internal.corp.example.com"), Outcome::Deny },
    www = { Identifier::dns("www.example.com"), Outcome::Allow },
    apex = { Identifier::dns("example.com"), Outcome::Deny },
    service_regex = { Identifier::dns("svc-billing.apps.example.com"), Outcome::Allow },
    service_regex_miss = { Identifier::dns("billing.apps.example.com"), Outcome::Deny },
    email = { Identifier::email("alice@example.com"), Outcome::Allow },
    root_email = { Identifier::email("ROOT@example.com"), Outcome::Deny },
    spiffe = { Identifier::uri("spiffe://example.com/workload/web"), Outcome::Allow },
    spiffe_other = { Identifier::uri("spiffe://example.com/other/web"), Outcome::Deny },
    https_any_path = { Identifier::uri("https://portal.example.com/login"), Outcome::Allow },
    https_admin = { Identifier::uri("https://portal.example.com/admin/users"), Outcome::Deny },
    plain_http = { Identifier::uri("http://portal.example.com/login"), Outcome::Deny },
    ip = { Identifier::ip("10.20.30.40"), Outcome::Allow },
    ip_denied = { Identifier::ip("10.255.1.1"), Outcome::Deny },
    ipv6 = { Identifier::ip("2001:db8:1::5"), Outcome::Allow },
    cn_literal = { Identifier::common_name("Example Corp Issuing CA"), Outcome::Allow },
    cn_regex = { Identifier::common_name("web.example.com"), Outcome::Allow },
    cn_other = { Identifier::common_name("Example Corp"), Outcome::Deny },
)]
fn test_x509(identifier: Identifier, outcome: Outcome) {
    let decision = init_engine()
        .evaluate_one(PolicyBranch::X509, &identifier)
        .unwrap();
    assert_eq!(decision.outcome(), outcome, "{decision}");
}

#[parameterized(
    host = { Identifier::dns("web1.hosts.example.com"), Outcome::Allow },
    bastion = { Identifier::dns("bastion.hosts.example.com"), Outcome::Deny },
    other_domain = { Identifier::dns("web1.example.net"), Outcome::Deny },
    principal = { Identifier::principal("web1"), Outcome::Allow },
    principal_upper = { Identifier::principal("WEB1"), Outcome::Deny },
)]
fn test_ssh_host(identifier: Identifier, outcome: Outcome) {
    let decision = init_engine()
        .evaluate_one(PolicyBranch::SshHost, &identifier)
        .unwrap();
    assert_eq!(decision.outcome(), outcome, "{decision}");
}

#[parameterized(
    user = { Identifier::principal("alice"), Outcome::Allow, DecisionReason::AllowedByPattern },
    deploy = { Identifier::principal("deploy"), Outcome::Allow, DecisionReason::AllowedByPattern },
    root = { Identifier::principal("root"), Outcome::Deny, DecisionReason::DeniedByPattern },
    admin = { Identifier::principal("admin"), Outcome::Deny, DecisionReason::DeniedByPattern },
    digits = { Identifier::principal("alice2"), Outcome::Deny, DecisionReason::NotAllowListed },
    email = { Identifier::email("alice@example.com"), Outcome::Allow, DecisionReason::AllowedByPattern },
    plus_email = { Identifier::email("alice+ci@example.com"), Outcome::Deny, DecisionReason::DeniedByPattern },
    foreign_email = { Identifier::email("alice@example.org"), Outcome::Deny, DecisionReason::NotAllowListed },
)]
fn test_ssh_user(identifier: Identifier, outcome: Outcome, reason: DecisionReason) {
    let decision = init_engine()
        .evaluate_one(PolicyBranch::SshUser, &identifier)
        .unwrap();
    assert_eq!(decision.outcome(), outcome, "{decision}");
    assert_eq!(decision.reason(), reason, "{decision}");
}

#[test]
fn test_server_certificate_request() {
    let engine = init_engine();
    let request = CertificateRequest::x509().with_identifiers([
        Identifier::common_name("web.corp.example.com"),
        Identifier::dns("web.corp.example.com"),
        Identifier::dns("www.example.com"),
        Identifier::ip("10.1.1.1"),
    ]);
    let decision = engine.evaluate(&request).unwrap();
    assert!(decision.is_allowed(), "{decision}");

    let request = request.with_identifier(Identifier::dns("db.internal.corp.example.com"));
    let decision = engine.evaluate(&request).unwrap();
    assert!(!decision.is_allowed());
    assert_eq!(decision.denials().count(), 1);
}

#[test]
fn test_cli_style_edit_session() {
    let engine = init_engine();
    let before = engine.current_version();
    let principal = Identifier::principal("carol_ops");

    assert_eq!(
        engine
            .evaluate_one(PolicyBranch::SshUser, &principal)
            .unwrap()
            .outcome(),
        Outcome::Deny
    );

    let edit = PolicyEdit::add(
        PolicyBranch::SshUser,
        ListKind::Allow,
        RuleKind::Principal,
        ["carol_ops", "deploy"],
    );
    assert!(engine.apply(&edit).unwrap());
    assert_eq!(
        engine
            .evaluate_one(PolicyBranch::SshUser, &principal)
            .unwrap()
            .outcome(),
        Outcome::Allow
    );

    let after = engine.current_version();
    assert_eq!(after.generation, before.generation + 1);
    assert_ne!(after.hash, before.hash);

    // The edited document persists and reloads to the same version.
    let persisted = document_to_json(&engine.document()).unwrap();
    let reloaded = PolicyEngine::new_from_str(&persisted).unwrap();
    assert_eq!(reloaded.current_version().hash, after.hash);
}
