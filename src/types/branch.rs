//! Policy branches (certificate types) and the allow/deny list selector.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::IdentifierKind;

/// The certificate-type specific scope a rule lives in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyBranch {
    #[strum(serialize = "x509", to_string = "X.509")]
    X509,
    #[strum(serialize = "ssh_host", to_string = "SSH host")]
    SshHost,
    #[strum(serialize = "ssh_user", to_string = "SSH user")]
    SshUser,
}

impl PolicyBranch {
    /// Whether rules for `kind` may be configured on (and evaluated for) this branch.
    ///
    /// | kind        | X.509 | SSH host | SSH user |
    /// |-------------|-------|----------|----------|
    /// | dns         | yes   | yes      | no       |
    /// | email       | yes   | no       | yes      |
    /// | uri         | yes   | no       | no       |
    /// | ip_range    | yes   | no       | no       |
    /// | common_name | yes   | no       | no       |
    /// | principal   | no    | yes      | yes      |
    pub fn supports(&self, kind: IdentifierKind) -> bool {
        use IdentifierKind::*;
        match self {
            PolicyBranch::X509 => match kind {
                Dns | Email | Uri | IpRange | CommonName => true,
                Principal => false,
            },
            PolicyBranch::SshHost => match kind {
                Dns | Principal => true,
                Email | Uri | IpRange | CommonName => false,
            },
            PolicyBranch::SshUser => match kind {
                Email | Principal => true,
                Dns | Uri | IpRange | CommonName => false,
            },
        }
    }
}

/// Selects the allow or the deny side of a branch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListKind {
    Allow,
    Deny,
}
