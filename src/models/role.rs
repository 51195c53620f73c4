use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Role descriptor attached to a permission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub name: String,
}

/// Full menu/access tree for one role, as returned by
/// `GET /api/v1/role/permission?roleId=`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<RoleRef>,
    // A payload without usable menus degrades to "nothing granted"
    #[serde(default, deserialize_with = "lenient_list")]
    pub menus: Vec<Menu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sequence_no: i32,
    #[serde(default, deserialize_with = "lenient_list")]
    pub accesses: Vec<Access>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Access {
    /// Absent `isActive` is an inactive access
    pub fn granted(&self) -> bool {
        self.is_active.unwrap_or(false)
    }
}

/// Permission list from a response `data` field. Anything but an array is
/// empty and malformed entries are dropped, so a bad payload grants nothing.
pub fn decode_permissions(data: Option<Value>) -> Vec<RolePermission> {
    decode_list(data)
}

fn decode_list<T: DeserializeOwned>(raw: Option<Value>) -> Vec<T> {
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed permission entry");
                    None
                }
            })
            .collect(),
        Some(_) => {
            tracing::warn!("permission payload is not a list, treating as empty");
            Vec::new()
        }
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(decode_list(Option::<Value>::deserialize(deserializer)?))
}

/// Role record from `GET /api/v1/role`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_root: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Navigation entry from `GET /api/v1/menu/side`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideMenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sequence_no: i32,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub children: Vec<SideMenuItem>,
}
