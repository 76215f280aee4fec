//! Checker configuration file support.
//!
//! One TOML file carries the run limits, the default clinic settings, the
//! clinic list, and per-clinic staff rules. It is loaded once per run and
//! passed down read-only.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{SlotError, SlotResult};
use crate::models::{IntervalPolicy, SourceSystem, StaffMember, StaffRole};
use crate::preprocessing::{IngestConfig, OperatingHours};

/// Full checker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub settings: ClinicSettings,
    #[serde(default)]
    pub clinics: Vec<ClinicConfig>,
    /// Staff rules keyed by clinic name.
    #[serde(default)]
    pub staff: BTreeMap<String, StaffRules>,
}

/// Concurrency and timeout limits of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default = "default_dent_sys_concurrency")]
    pub dent_sys_concurrency: usize,
    #[serde(default = "default_stransa_concurrency")]
    pub stransa_concurrency: usize,
    #[serde(default = "default_clinic_timeout_secs")]
    pub clinic_timeout_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

fn default_dent_sys_concurrency() -> usize {
    3
}

fn default_stransa_concurrency() -> usize {
    5
}

fn default_clinic_timeout_secs() -> u64 {
    120
}

fn default_run_timeout_secs() -> u64 {
    900
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dent_sys_concurrency: default_dent_sys_concurrency(),
            stransa_concurrency: default_stransa_concurrency(),
            clinic_timeout_secs: default_clinic_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl RunSettings {
    pub fn concurrency_for(&self, system: SourceSystem) -> usize {
        match system {
            SourceSystem::DentSys => self.dent_sys_concurrency,
            SourceSystem::Stransa => self.stransa_concurrency,
        }
    }

    pub fn clinic_timeout(&self) -> Duration {
        Duration::from_secs(self.clinic_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Minimum free minutes per role for a run to count as a bookable block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotThreshold {
    #[serde(default = "default_threshold_minutes")]
    pub doctor: u32,
    #[serde(default = "default_threshold_minutes")]
    pub hygienist: u32,
    #[serde(default = "default_threshold_minutes")]
    pub unknown: u32,
}

fn default_threshold_minutes() -> u32 {
    30
}

impl Default for SlotThreshold {
    fn default() -> Self {
        Self {
            doctor: default_threshold_minutes(),
            hygienist: default_threshold_minutes(),
            unknown: default_threshold_minutes(),
        }
    }
}

impl SlotThreshold {
    pub fn minutes_for(&self, role: StaffRole) -> u32 {
        match role {
            StaffRole::Doctor => self.doctor,
            StaffRole::Hygienist => self.hygienist,
            StaffRole::Unknown => self.unknown,
        }
    }

    fn overridden(mut self, with: &RoleValues<u32>) -> Self {
        if let Some(v) = with.doctor {
            self.doctor = v;
        }
        if let Some(v) = with.hygienist {
            self.hygienist = v;
        }
        if let Some(v) = with.unknown {
            self.unknown = v;
        }
        self
    }
}

/// Optional per-role values, used for partial overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleValues<T> {
    #[serde(default)]
    pub doctor: Option<T>,
    #[serde(default)]
    pub hygienist: Option<T>,
    #[serde(default)]
    pub unknown: Option<T>,
}

impl<T: Copy> RoleValues<T> {
    pub fn for_role(&self, role: StaffRole) -> Option<T> {
        match role {
            StaffRole::Doctor => self.doctor,
            StaffRole::Hygienist => self.hygienist,
            StaffRole::Unknown => self.unknown,
        }
    }
}

/// Effective settings of one clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicSettings {
    #[serde(default = "default_minimum_blocks_required")]
    pub minimum_blocks_required: usize,
    /// Staff whose name contains any of these substrings are not counted.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Overrides the minute thresholds for every role when set.
    #[serde(default)]
    pub consecutive_slots_required: Option<usize>,
    /// Forces a fixed slot interval instead of the source system's policy.
    #[serde(default)]
    pub slot_interval_minutes: Option<u32>,
    #[serde(default)]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default)]
    pub slot_threshold: SlotThreshold,
}

fn default_minimum_blocks_required() -> usize {
    4
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["訪問".to_string()]
}

impl Default for ClinicSettings {
    fn default() -> Self {
        Self {
            minimum_blocks_required: default_minimum_blocks_required(),
            exclude_patterns: default_exclude_patterns(),
            consecutive_slots_required: None,
            slot_interval_minutes: None,
            operating_hours: None,
            slot_threshold: SlotThreshold::default(),
        }
    }
}

impl ClinicSettings {
    pub fn is_excluded(&self, staff_name: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|p| !p.is_empty() && staff_name.contains(p.as_str()))
    }

    /// Ingestion options implied by these settings.
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            interval_policy: self.slot_interval_minutes.map(IntervalPolicy::Fixed),
            operating_hours: self.operating_hours,
        }
    }
}

/// Per-clinic overrides of [`ClinicSettings`]; unset keys inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsOverride {
    #[serde(default)]
    pub minimum_blocks_required: Option<usize>,
    #[serde(default)]
    pub exclude_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub consecutive_slots_required: Option<usize>,
    #[serde(default)]
    pub slot_interval_minutes: Option<u32>,
    #[serde(default)]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default)]
    pub slot_threshold: RoleValues<u32>,
}

/// One configured clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub name: String,
    pub system: SourceSystem,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: Option<SettingsOverride>,
}

fn default_enabled() -> bool {
    true
}

/// Staff rules of one clinic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRules {
    #[serde(default)]
    pub doctors: Vec<String>,
    #[serde(default)]
    pub hygienists: Vec<String>,
    /// Staff that appear in the grid but are never counted.
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub memos: BTreeMap<String, String>,
    /// Clinic-specific threshold minutes per role.
    #[serde(default)]
    pub slot_threshold: RoleValues<u32>,
    /// Clinic-specific required slot counts per role.
    #[serde(default)]
    pub role_slots: RoleValues<usize>,
}

impl StaffRules {
    /// Look up a grid column name.
    ///
    /// # Returns
    /// * `Some(StaffMember)` - If the name is listed as doctor, hygienist, or disabled
    /// * `None` - If the name is not configured at all
    pub fn lookup(&self, name: &str) -> Option<StaffMember> {
        let name = name.trim();
        let listed = |names: &[String]| names.iter().any(|n| n.trim() == name);

        let role = if listed(&self.doctors) {
            StaffRole::Doctor
        } else if listed(&self.hygienists) {
            StaffRole::Hygienist
        } else {
            StaffRole::Unknown
        };
        let enabled = !listed(&self.disabled);
        if role == StaffRole::Unknown && enabled {
            return None;
        }

        Some(StaffMember {
            staff_id: name.to_string(),
            display_name: name.to_string(),
            role,
            enabled,
            memo: self
                .memos
                .iter()
                .find(|(key, _)| key.trim() == name)
                .map(|(_, memo)| memo.clone()),
        })
    }
}

fn check_hours(scope: &str, hours: Option<OperatingHours>) -> SlotResult<()> {
    match hours {
        Some(h) if h.open >= h.close => Err(SlotError::Configuration(format!(
            "{}: operating hours open at {} but close at {}",
            scope,
            h.open.format("%H:%M"),
            h.close.format("%H:%M")
        ))),
        _ => Ok(()),
    }
}

impl CheckerConfig {
    /// Load checker configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(CheckerConfig)` if successful
    /// * `Err(SlotError::Configuration)` if the file cannot be read, parsed, or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> SlotResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SlotError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SlotResult<Self> {
        let config: CheckerConfig = toml::from_str(content).map_err(|e| {
            SlotError::Configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SlotResult<()> {
        if self.run.dent_sys_concurrency == 0 || self.run.stransa_concurrency == 0 {
            return Err(SlotError::Configuration(
                "concurrency limits must be at least 1".to_string(),
            ));
        }

        check_hours("default settings", self.settings.operating_hours)?;

        let mut names = HashSet::new();
        for clinic in &self.clinics {
            if clinic.name.trim().is_empty() {
                return Err(SlotError::Configuration("clinic without a name".to_string()));
            }
            if !names.insert(clinic.name.as_str()) {
                return Err(SlotError::Configuration(format!(
                    "clinic '{}' is configured twice",
                    clinic.name
                )));
            }
            if self.settings_for(clinic).slot_interval_minutes == Some(0) {
                return Err(SlotError::Configuration(format!(
                    "clinic '{}': slot_interval_minutes must be positive",
                    clinic.name
                )));
            }
            check_hours(
                &format!("clinic '{}'", clinic.name),
                self.settings_for(clinic).operating_hours,
            )?;
        }

        for clinic in self.staff.keys() {
            if !names.contains(clinic.as_str()) {
                log::warn!("staff rules for unknown clinic '{}'", clinic);
            }
        }
        Ok(())
    }

    /// Enabled clinics in configuration order, optionally for one system only.
    pub fn enabled_clinics(&self, system: Option<SourceSystem>) -> Vec<&ClinicConfig> {
        self.clinics
            .iter()
            .filter(|c| c.enabled)
            .filter(|c| system.map_or(true, |s| c.system == s))
            .collect()
    }

    /// Default settings merged with the clinic's overrides.
    pub fn settings_for(&self, clinic: &ClinicConfig) -> ClinicSettings {
        let mut settings = self.settings.clone();
        let Some(o) = &clinic.settings else {
            return settings;
        };

        if let Some(v) = o.minimum_blocks_required {
            settings.minimum_blocks_required = v;
        }
        if let Some(v) = &o.exclude_patterns {
            settings.exclude_patterns = v.clone();
        }
        if o.consecutive_slots_required.is_some() {
            settings.consecutive_slots_required = o.consecutive_slots_required;
        }
        if o.slot_interval_minutes.is_some() {
            settings.slot_interval_minutes = o.slot_interval_minutes;
        }
        if o.operating_hours.is_some() {
            settings.operating_hours = o.operating_hours;
        }
        settings.slot_threshold = settings.slot_threshold.overridden(&o.slot_threshold);
        settings
    }

    /// Staff rules of a clinic; empty rules when none are configured.
    pub fn staff_rules_for(&self, clinic_name: &str) -> StaffRules {
        self.staff.get(clinic_name).cloned().unwrap_or_default()
    }
}

/// Required consecutive slots for a role.
///
/// Resolution order: the clinic's per-role slot override, then the clinic-wide
/// `consecutive_slots_required`, then the role's threshold minutes divided by
/// the interval, rounded up.
pub fn required_slots(
    role: StaffRole,
    rules: &StaffRules,
    settings: &ClinicSettings,
    interval_minutes: u32,
) -> usize {
    if let Some(slots) = rules.role_slots.for_role(role) {
        return slots.max(1);
    }
    if let Some(slots) = settings.consecutive_slots_required {
        return slots.max(1);
    }
    let minutes = rules
        .slot_threshold
        .for_role(role)
        .unwrap_or_else(|| settings.slot_threshold.minutes_for(role));
    let interval = interval_minutes.max(1);
    (minutes.div_ceil(interval) as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[run]
dent_sys_concurrency = 2
clinic_timeout_secs = 60

[settings]
minimum_blocks_required = 4

[settings.slot_threshold]
hygienist = 45

[[clinics]]
name = "駅前院"
system = "dent-sys"
url = "https://dent-sys.example/ekimae"

[[clinics]]
name = "本院"
system = "stransa"
enabled = false

[[clinics]]
name = "南口院"
system = "stransa"

[clinics.settings]
minimum_blocks_required = 2
exclude_patterns = ["訪問", "研修"]
operating_hours = { open = "09:00", close = "18:30" }
slot_threshold = { doctor = 60 }

[staff."駅前院"]
doctors = ["橋本", "院長"]
hygienists = ["DH中山"]
disabled = ["休診枠"]
memos = { "橋本" = "午前のみ" }
role_slots = { hygienist = 3 }
"#;

    #[test]
    fn test_parse_sample() {
        let config = CheckerConfig::from_str(SAMPLE).unwrap();

        assert_eq!(config.run.dent_sys_concurrency, 2);
        assert_eq!(config.run.stransa_concurrency, 5);
        assert_eq!(config.run.clinic_timeout(), Duration::from_secs(60));
        assert_eq!(config.run.run_timeout(), Duration::from_secs(900));
        assert_eq!(config.clinics.len(), 3);
        assert_eq!(config.settings.exclude_patterns, vec!["訪問".to_string()]);
        assert_eq!(config.settings.slot_threshold.hygienist, 45);
        assert_eq!(config.settings.slot_threshold.doctor, 30);
    }

    #[test]
    fn test_enabled_clinics_filter() {
        let config = CheckerConfig::from_str(SAMPLE).unwrap();

        let all: Vec<&str> = config
            .enabled_clinics(None)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(all, vec!["駅前院", "南口院"]);

        let stransa = config.enabled_clinics(Some(SourceSystem::Stransa));
        assert_eq!(stransa.len(), 1);
        assert_eq!(stransa[0].name, "南口院");
    }

    #[test]
    fn test_settings_overrides_merge() {
        let config = CheckerConfig::from_str(SAMPLE).unwrap();
        let minamiguchi = &config.clinics[2];
        let settings = config.settings_for(minamiguchi);

        assert_eq!(settings.minimum_blocks_required, 2);
        assert!(settings.is_excluded("研修スタッフ"));
        assert_eq!(settings.slot_threshold.doctor, 60);
        assert_eq!(settings.slot_threshold.hygienist, 45);
        assert_eq!(
            settings.operating_hours,
            Some(OperatingHours {
                open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                close: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            })
        );

        let ekimae = config.settings_for(&config.clinics[0]);
        assert_eq!(ekimae, config.settings);
    }

    #[test]
    fn test_staff_lookup() {
        let config = CheckerConfig::from_str(SAMPLE).unwrap();
        let rules = config.staff_rules_for("駅前院");

        let hashimoto = rules.lookup("橋本").unwrap();
        assert_eq!(hashimoto.role, StaffRole::Doctor);
        assert_eq!(hashimoto.memo.as_deref(), Some("午前のみ"));
        assert!(hashimoto.enabled);

        assert_eq!(rules.lookup(" DH中山 ").unwrap().role, StaffRole::Hygienist);
        assert!(!rules.lookup("休診枠").unwrap().enabled);
        assert!(rules.lookup("DH尾崎").is_none());
        assert!(config.staff_rules_for("南口院").lookup("橋本").is_none());
    }

    #[test]
    fn test_memo_keys_are_trimmed() {
        let content = r#"
[staff."駅前院"]
doctors = ["橋本"]
memos = { " 橋本 " = "午後休診" }
"#;
        let config = CheckerConfig::from_str(content).unwrap();
        let hashimoto = config.staff_rules_for("駅前院").lookup("橋本").unwrap();
        assert_eq!(hashimoto.memo.as_deref(), Some("午後休診"));
    }

    #[test]
    fn test_required_slots_resolution() {
        let config = CheckerConfig::from_str(SAMPLE).unwrap();
        let rules = config.staff_rules_for("駅前院");
        let settings = config.settings_for(&config.clinics[0]);

        assert_eq!(required_slots(StaffRole::Doctor, &rules, &settings, 5), 6);
        assert_eq!(required_slots(StaffRole::Doctor, &rules, &settings, 15), 2);
        // 30 minutes on a 20-minute grid needs two slots.
        assert_eq!(required_slots(StaffRole::Unknown, &rules, &settings, 20), 2);
        assert_eq!(required_slots(StaffRole::Hygienist, &rules, &settings, 5), 3);

        let fixed = ClinicSettings {
            consecutive_slots_required: Some(4),
            ..settings.clone()
        };
        assert_eq!(required_slots(StaffRole::Doctor, &rules, &fixed, 5), 4);
        assert_eq!(required_slots(StaffRole::Hygienist, &rules, &fixed, 5), 3);
    }

    #[test]
    fn test_rejects_duplicate_clinics() {
        let content = r#"
[[clinics]]
name = "駅前院"
system = "dent-sys"

[[clinics]]
name = "駅前院"
system = "stransa"
"#;
        let result = CheckerConfig::from_str(content);
        assert!(matches!(result, Err(SlotError::Configuration(_))));
    }

    #[test]
    fn test_rejects_inverted_operating_hours() {
        let clinic_override = r#"
[[clinics]]
name = "南口院"
system = "stransa"

[clinics.settings]
operating_hours = { open = "18:30", close = "09:00" }
"#;
        assert!(matches!(
            CheckerConfig::from_str(clinic_override),
            Err(SlotError::Configuration(_))
        ));

        let defaults = r#"
[settings]
operating_hours = { open = "09:00", close = "09:00" }
"#;
        assert!(matches!(
            CheckerConfig::from_str(defaults),
            Err(SlotError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_system() {
        let content = r#"
[[clinics]]
name = "駅前院"
system = "apotool"
"#;
        assert!(matches!(
            CheckerConfig::from_str(content),
            Err(SlotError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = CheckerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.clinics[0].url, "https://dent-sys.example/ekimae");

        let missing = CheckerConfig::from_file("/nonexistent/checker.toml");
        assert!(matches!(missing, Err(SlotError::Configuration(_))));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CheckerConfig::from_str("").unwrap();
        assert!(config.clinics.is_empty());
        assert_eq!(config.settings.minimum_blocks_required, 4);
        assert_eq!(config.run.concurrency_for(SourceSystem::DentSys), 3);
        assert_eq!(config.run.concurrency_for(SourceSystem::Stransa), 5);
    }
}
