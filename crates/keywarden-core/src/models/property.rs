use serde::{Deserialize, Serialize};

/// An authorized resource scope: one property the signed-in user may manage.
///
/// Wire format matches the resource API's `/api/properties/` payload, which
/// already uses snake_case field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PropertyScope {
    pub property_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
