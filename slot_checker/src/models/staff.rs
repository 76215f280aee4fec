use serde::{Deserialize, Serialize};
use std::fmt;

/// Staff role, as configured in the staff rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Doctor,
    Hygienist,
    /// Present in the grid but missing from configuration.
    Unknown,
}

impl StaffRole {
    pub const ALL: [StaffRole; 3] = [StaffRole::Doctor, StaffRole::Hygienist, StaffRole::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "doctor",
            StaffRole::Hygienist => "hygienist",
            StaffRole::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff member as known to configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub staff_id: String,
    pub display_name: String,
    pub role: StaffRole,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl StaffMember {
    /// Placeholder for a grid column that has no configuration entry.
    pub fn unconfigured(name: &str) -> Self {
        Self {
            staff_id: name.to_string(),
            display_name: name.to_string(),
            role: StaffRole::Unknown,
            enabled: true,
            memo: None,
        }
    }
}
