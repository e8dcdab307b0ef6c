//! Request DTOs for the edge service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Maximum accepted item name length in characters.
pub const MAX_ITEM_NAME_LENGTH: usize = 256;

/// Request body for `POST /api/items`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    /// Display name, unique across items
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateItemRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_ITEM_NAME_LENGTH {
            return Some(format!(
                "Name exceeds maximum length of {} characters",
                MAX_ITEM_NAME_LENGTH
            ));
        }
        None
    }
}

/// Query string for `GET /api/items`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}
