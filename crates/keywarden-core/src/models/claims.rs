use serde::{Deserialize, Serialize};

/// Identity claims established at sign-in.
///
/// Immutable for the lifetime of a session: a new sign-in replaces the whole
/// value, nothing ever mutates individual fields. Credential material is
/// deliberately absent; tokens live in the credential store only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct IdentityClaims {
    /// Stable subject identifier from the identity backend.
    pub subject: String,
    pub username: String,
    pub email: Option<String>,
    /// Role/position label, e.g. "Technician" or "Manager".
    pub position: String,
    pub profile_image: String,
    /// Identifiers of the properties this user may operate on.
    pub property_ids: Vec<String>,
}

impl IdentityClaims {
    /// Display name for UI surfaces: username, which the backend guarantees.
    pub fn display_name(&self) -> &str {
        &self.username
    }

    pub fn has_property(&self, property_id: &str) -> bool {
        self.property_ids.iter().any(|id| id == property_id)
    }
}
