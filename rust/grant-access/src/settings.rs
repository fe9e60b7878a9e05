//! Principal namespaces used by the resolution rules.

use serde::{Deserialize, Serialize};

/// Principal namespaces the resolution rules are parameterized by.
///
/// Each field is a glob over DIDs. Missing fields fall back to the defaults,
/// so a partial configuration only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Accounts whose grants require a service attestation
    pub account: String,
    /// Independently keyed spaces
    pub space: String,
    /// Services trusted to issue login attestations
    pub provider: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account: "did:mailto:*".into(),
            space: "did:key:*".into(),
            provider: "did:web:*".into(),
        }
    }
}
