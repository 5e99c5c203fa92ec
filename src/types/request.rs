//! Certificate request as seen by the policy engine.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Identifier, PolicyBranch};

/// The certificate type being issued and every name it would carry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub struct CertificateRequest {
    pub branch: PolicyBranch,
    pub identifiers: Vec<Identifier>,
}

impl CertificateRequest {
    pub fn new(branch: PolicyBranch) -> Self {
        CertificateRequest {
            branch,
            identifiers: Vec::new(),
        }
    }

    pub fn x509() -> Self {
        Self::new(PolicyBranch::X509)
    }

    pub fn ssh_host() -> Self {
        Self::new(PolicyBranch::SshHost)
    }

    pub fn ssh_user() -> Self {
        Self::new(PolicyBranch::SshUser)
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    pub fn with_identifiers(mut self, identifiers: impl IntoIterator<Item = Identifier>) -> Self {
        self.identifiers.extend(identifiers);
        self
    }
}
