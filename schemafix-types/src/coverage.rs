use serde::{Deserialize, Serialize};

/// How repairs participate in coverage accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    #[default]
    Off,
    Measure,
    Guided,
}

impl CoverageMode {
    pub fn is_active(self) -> bool {
        matches!(self, CoverageMode::Measure | CoverageMode::Guided)
    }
}

/// One coverage hit emitted by a repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEvent {
    pub dimension: String,
    pub kind: String,
    pub canon_path: String,
    pub params: serde_json::Value,
}

impl CoverageEvent {
    pub fn property_present(canon_path: &str, property_name: &str) -> Self {
        Self {
            dimension: "structure".to_string(),
            kind: "PROPERTY_PRESENT".to_string(),
            canon_path: canon_path.to_string(),
            params: serde_json::json!({ "propertyName": property_name }),
        }
    }
}
