use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Id;

/// One configurable knob of an enhancement run (codec, container, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub sequence_no: i32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub setting_values: Vec<SettingValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingValue {
    pub id: Id,
    pub name: String,
    /// String, number or boolean depending on the setting
    pub value: Value,
    #[serde(default)]
    pub setting_id: Option<Id>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Setting {
    pub fn default_value(&self) -> Option<&SettingValue> {
        self.setting_values.iter().find(|v| v.is_default)
    }

    /// Look a value up by its display name or raw value
    pub fn find_value(&self, wanted: &str) -> Option<&SettingValue> {
        self.setting_values.iter().find(|v| {
            v.name.eq_ignore_ascii_case(wanted) || value_text(&v.value).eq_ignore_ascii_case(wanted)
        })
    }
}

/// Settings the request payload needs, matched by setting name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Quality,
    Codec,
    Container,
    Resolution,
    Grain,
    Comparison,
}

impl SettingKind {
    pub const ALL: [SettingKind; 6] = [
        SettingKind::Quality,
        SettingKind::Codec,
        SettingKind::Container,
        SettingKind::Resolution,
        SettingKind::Grain,
        SettingKind::Comparison,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            SettingKind::Quality => "quality",
            SettingKind::Codec => "codec",
            SettingKind::Container => "container",
            SettingKind::Resolution => "resolution",
            SettingKind::Grain => "grain",
            SettingKind::Comparison => "comparison",
        }
    }

    pub fn matches(&self, setting: &Setting) -> bool {
        setting.name.to_ascii_lowercase().contains(self.keyword())
    }

    pub fn find<'a>(&self, settings: &'a [Setting]) -> Option<&'a Setting> {
        settings.iter().find(|s| self.matches(s))
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
