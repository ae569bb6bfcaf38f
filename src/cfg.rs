use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::C2gError;

pub const CONFIG_FILE_NAME: &str = "c2g.config.json";
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cfg {
    pub source_dir: PathBuf,
    pub target_drive_folder_id: String,
    pub target_is_shared_drive: bool,
    pub update_existing_google_sheets: bool,
    pub save_original_files_to_drive: bool,
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            source_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            target_drive_folder_id: ROOT_FOLDER_ID.to_string(),
            target_is_shared_drive: false,
            update_existing_google_sheets: false,
            save_original_files_to_drive: false,
        }
    }
}

impl Cfg {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, C2gError> {
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(C2gError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| C2gError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Value = serde_json::from_str(&content)?;
        let cfg = Self::validate(&parsed)?;

        debug!("Final configuration: {:?}", cfg);
        Ok(cfg)
    }

    /// Type-check every field present in `partial` and fill the absent ones
    /// from [`Cfg::default`]. `null` counts as absent.
    pub fn validate(partial: &Value) -> Result<Self, C2gError> {
        let fields = partial.as_object().ok_or(C2gError::ConfigNotObject)?;
        let mut cfg = Cfg::default();

        if let Some(source_dir) = string_field(fields, "sourceDir")? {
            let source_dir = PathBuf::from(source_dir);
            if !source_dir.exists() {
                return Err(C2gError::InvalidPath(source_dir));
            }
            cfg.source_dir = source_dir;
        }
        if let Some(id) = string_field(fields, "targetDriveFolderId")? {
            cfg.target_drive_folder_id = id.to_string();
        }
        if let Some(flag) = bool_field(fields, "targetIsSharedDrive")? {
            cfg.target_is_shared_drive = flag;
        }
        if let Some(flag) = bool_field(fields, "updateExistingGoogleSheets")? {
            cfg.update_existing_google_sheets = flag;
        }
        if let Some(flag) = bool_field(fields, "saveOriginalFilesToDrive")? {
            cfg.save_original_files_to_drive = flag;
        }

        debug!("Configuration validation passed");
        Ok(cfg)
    }

    /// Write this configuration as pretty JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), C2gError> {
        let write_error = |source: std::io::Error| C2gError::WriteConfig {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| write_error(e.into()))?;
        fs::write(path, json).map_err(write_error)?;

        info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// The settings banner shown before a conversion, one `key: value` per line.
    pub fn settings_summary(&self) -> String {
        [
            format!("sourceDir: {}", self.source_dir.display()),
            format!("targetDriveFolderId: {}", self.target_drive_folder_id),
            format!("targetIsSharedDrive: {}", self.target_is_shared_drive),
            format!(
                "updateExistingGoogleSheets: {}",
                self.update_existing_google_sheets
            ),
            format!(
                "saveOriginalFilesToDrive: {}",
                self.save_original_files_to_drive
            ),
        ]
        .join("\n  ")
    }

    /// The folder id to send to Drive in queries and `parents`. Any letter
    /// case of `root` becomes the `root` alias.
    pub fn drive_parent_id(&self) -> &str {
        if is_root(&self.target_drive_folder_id) {
            ROOT_FOLDER_ID
        } else {
            &self.target_drive_folder_id
        }
    }
}

/// `root` in any letter case refers to the top of My Drive.
pub fn is_root(folder_id: &str) -> bool {
    folder_id.eq_ignore_ascii_case(ROOT_FOLDER_ID)
}

pub fn drive_folder_url(folder_id: &str) -> String {
    if is_root(folder_id) {
        "https://drive.google.com/drive/my-drive".to_string()
    } else {
        format!("https://drive.google.com/drive/folders/{}", folder_id)
    }
}

/// Explicit path when given, otherwise the default file name in the working directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_FILE_NAME),
    }
}

fn string_field<'a>(
    fields: &'a serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, C2gError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(C2gError::TypeMismatch {
            field: name,
            expected: "a string",
        }),
    }
}

fn bool_field(
    fields: &serde_json::Map<String, Value>,
    name: &'static str,
) -> Result<Option<bool>, C2gError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(C2gError::TypeMismatch {
            field: name,
            expected: "a boolean, i.e., it must be either true or false",
        }),
    }
}
