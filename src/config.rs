//! Persisted settings store.
//!
//! All user-visible settings (claimants, station identity, reimbursement
//! rates, template paths) live in a single JSON document, loaded once at
//! startup and rewritten wholesale on every mutating operation. A missing or
//! unparseable store yields the built-in defaults rather than an error, so a
//! first run needs no setup.

use crate::errors::{Error, Result};
use crate::models::{IntercityRates, LocalRates, RateTable, UserRecord};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Default store location, next to the working directory the documents are
/// generated into.
pub const CONFIG_FILE: &str = "config.json";

/// Office identity used for zone classification and document headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInfo {
    /// Full office name, e.g. `龙潭供电所`.
    pub name: String,
    /// County seat place name.
    pub county: String,
    /// City place name.
    pub city: String,
}

/// Paths to the three pre-formatted template documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePaths {
    pub expense: String,
    pub audit: String,
    pub no_car: String,
}

/// The whole settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Index of the default claimant in `users`, `-1` when none is set.
    #[serde(default = "default_user_index")]
    pub current_user_index: i64,
    pub station_info: StationInfo,
    pub rules: RateTable,
    pub template_paths: TemplatePaths,
}

fn default_user_index() -> i64 {
    -1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            current_user_index: -1,
            station_info: StationInfo {
                name: "龙潭供电所".to_string(),
                county: "桃源县".to_string(),
                city: "常德市".to_string(),
            },
            rules: RateTable {
                local: LocalRates {
                    food: 40.0,
                    per_diem_misc: 0.0,
                },
                county: IntercityRates {
                    misc_one_way: 15.0,
                    misc_round_trip: 30.0,
                },
                city: IntercityRates {
                    misc_one_way: 25.0,
                    misc_round_trip: 50.0,
                },
            },
            template_paths: TemplatePaths {
                expense: "差旅费报销单模板.xlsx".to_string(),
                audit: "报销审核单模板.xlsx".to_string(),
                no_car: "未派车证明模板.xlsx".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Loads the store from `path`, falling back to the built-in defaults if
    /// the file is missing or does not parse.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path_ref = path.as_ref();
        tracing::debug!("Loading configuration from {:?}", path_ref);
        let contents = match fs::read_to_string(path_ref) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Config file {:?} not readable ({}), using defaults",
                    path_ref,
                    e
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Config file {:?} did not parse ({}), using defaults",
                    path_ref,
                    e
                );
                Self::default()
            }
        }
    }

    /// Rewrites the whole store atomically: serialize to a sibling temp file,
    /// then rename over the target.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        let tmp = path_ref.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path_ref)?;
        tracing::debug!("Saved configuration to {:?}", path_ref);
        Ok(())
    }

    /// The currently selected claimant, if any.
    pub fn current_user(&self) -> Option<&UserRecord> {
        usize::try_from(self.current_user_index)
            .ok()
            .and_then(|i| self.users.get(i))
    }

    /// Looks a claimant up by name.
    pub fn user_by_name(&self, name: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Adds a claimant. Names are unique: adding a second record under an
    /// existing name is rejected.
    pub fn add_user(&mut self, user: UserRecord) -> Result<()> {
        if self.user_by_name(&user.name).is_some() {
            return Err(Error::DuplicateUser(user.name));
        }
        self.users.push(user);
        Ok(())
    }

    /// Removes every claimant with the given name and clears the default
    /// selection, matching the legacy tool's delete semantics.
    pub fn remove_user(&mut self, name: &str) -> Result<()> {
        let before = self.users.len();
        self.users.retain(|u| u.name != name);
        if self.users.len() == before {
            return Err(Error::UnknownUser(name.to_string()));
        }
        self.current_user_index = -1;
        Ok(())
    }

    /// Marks the named claimant as the default selection.
    pub fn set_default_user(&mut self, name: &str) -> Result<()> {
        let index = self
            .users
            .iter()
            .position(|u| u.name == name)
            .ok_or_else(|| Error::UnknownUser(name.to_string()))?;
        self.current_user_index = index as i64;
        Ok(())
    }
}
