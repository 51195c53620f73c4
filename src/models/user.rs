use serde::{Deserialize, Serialize};

/// Minimal profile kept alongside the session tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar_file: Option<String>,
    #[serde(default)]
    pub role: String,
    pub role_id: String,
    #[serde(default)]
    pub is_active: bool,
}
