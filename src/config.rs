//! Configuration loading with env-var overrides.
//!
//! Reads the TOML file named by `CARDIO_CONFIG` (default
//! `config/default.toml`, relative to the working directory), then applies
//! the `CARDIO_*` overrides. When the default file is absent the built-in
//! defaults are used.

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::adapters::fs::ArtifactLayout;
use crate::adapters::manifest::{verifying_key_from_b64, IntegrityPolicy};
use crate::application::StartupOptions;
use crate::{CardioError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Where log output goes. Stdout always carries protocol responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    Stderr,
    File,
}

impl std::str::FromStr for LogMode {
    type Err = CardioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" => Ok(Self::Stderr),
            "file" => Ok(Self::File),
            other => Err(CardioError::Config(format!(
                "unknown log mode {other:?} (expected \"stderr\" or \"file\")"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub mode: LogMode,
    /// Log file path, used when `mode` is `File`
    pub file: PathBuf,
    /// `EnvFilter` directives; `RUST_LOG` takes precedence at runtime
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactsConfig {
    /// Artifact directory; model locations are relative to it
    pub dir: PathBuf,
    pub layout: ArtifactLayout,
    pub require_signed: bool,
    /// Base64 Ed25519 public key for `manifest.sig`
    pub signing_pubkey_b64: Option<String>,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub artifacts: ArtifactsConfig,
    /// Logical model name to artifact location
    pub models: BTreeMap<String, String>,
    pub strict_startup: bool,
    pub log: LogConfig,
}

impl Config {
    /// Integrity policy for opening the artifact directory.
    ///
    /// # Errors
    /// Returns `Config` for a malformed key, or when signatures are required
    /// but no key is configured.
    pub fn integrity_policy(&self) -> Result<IntegrityPolicy> {
        let verifying_key = self
            .artifacts
            .signing_pubkey_b64
            .as_deref()
            .map(verifying_key_from_b64)
            .transpose()
            .map_err(|e| CardioError::Config(e.to_string()))?;

        if self.artifacts.require_signed && verifying_key.is_none() {
            return Err(CardioError::Config(
                "require_signed is set but no signing public key is configured".into(),
            ));
        }

        Ok(IntegrityPolicy {
            require_signed: self.artifacts.require_signed,
            verifying_key,
        })
    }

    #[must_use]
    pub fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            strict: self.strict_startup,
            models: self.models.clone(),
        }
    }
}

/// Values taken from the environment, applied over the file.
///
/// Tests build this directly instead of mutating env vars.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub artifact_dir: Option<PathBuf>,
    pub log_mode: Option<LogMode>,
    pub log_file: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub strict_startup: Option<bool>,
    pub require_signed: Option<bool>,
    pub signing_pubkey_b64_file: Option<PathBuf>,
}

impl Overrides {
    /// Read the `CARDIO_*` override variables.
    ///
    /// # Errors
    /// Returns `Config` for unparseable values.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Ok(Self {
            artifact_dir: var("CARDIO_ARTIFACT_DIR").map(PathBuf::from),
            log_mode: var("CARDIO_LOG_MODE").map(|v| v.parse::<LogMode>()).transpose()?,
            log_file: var("CARDIO_LOG_FILE").map(PathBuf::from),
            log_filter: var("CARDIO_LOG_FILTER"),
            strict_startup: var("CARDIO_STRICT_STARTUP")
                .map(|v| parse_flag("CARDIO_STRICT_STARTUP", &v))
                .transpose()?,
            require_signed: var("CARDIO_REQUIRE_SIGNED_ARTIFACTS")
                .map(|v| parse_flag("CARDIO_REQUIRE_SIGNED_ARTIFACTS", &v))
                .transpose()?,
            signing_pubkey_b64_file: var("CARDIO_SIGNING_PUBKEY_B64_FILE").map(PathBuf::from),
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CardioError::Config(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    artifacts: RawArtifacts,
    #[serde(default = "default_models")]
    models: BTreeMap<String, String>,
    #[serde(default)]
    startup: RawStartup,
    #[serde(default)]
    log: RawLog,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtifacts {
    #[serde(default = "default_artifact_dir")]
    dir: String,
    #[serde(default = "default_scaler")]
    scaler: String,
    #[serde(default = "default_summary_metrics")]
    summary_metrics: String,
    #[serde(default = "default_detailed_metrics")]
    detailed_metrics: String,
    #[serde(default)]
    require_signed: bool,
    #[serde(default)]
    signing_pubkey_b64: Option<String>,
}

impl Default for RawArtifacts {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            scaler: default_scaler(),
            summary_metrics: default_summary_metrics(),
            detailed_metrics: default_detailed_metrics(),
            require_signed: false,
            signing_pubkey_b64: None,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawStartup {
    #[serde(default)]
    strict: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLog {
    #[serde(default = "default_log_mode")]
    mode: LogMode,
    #[serde(default = "default_log_file")]
    file: String,
    #[serde(default = "default_log_filter")]
    filter: String,
}

impl Default for RawLog {
    fn default() -> Self {
        Self {
            mode: default_log_mode(),
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_artifact_dir() -> String { "artifacts".to_string() }
fn default_scaler() -> String { ArtifactLayout::default().scaler }
fn default_summary_metrics() -> String { ArtifactLayout::default().summary_metrics }
fn default_detailed_metrics() -> String { ArtifactLayout::default().detailed_metrics }
fn default_log_mode() -> LogMode { LogMode::Stderr }
fn default_log_file() -> String { "logs/cardiorisk.log".to_string() }
fn default_log_filter() -> String { "info".to_string() }

fn default_models() -> BTreeMap<String, String> {
    [
        ("XGBoost", "models/xgboost_model.json"),
        ("Random Forest", "models/random_forest_model.json"),
        ("Logistic Regression", "models/logistic_regression_model.json"),
        ("SVC", "models/svc_model.json"),
        ("KNN", "models/knn_model.json"),
        ("Decision Tree", "models/decision_tree_model.json"),
    ]
    .into_iter()
    .map(|(name, location)| (name.to_string(), location.to_string()))
    .collect()
}

/// Load config from `CARDIO_CONFIG` or `config/default.toml`, then apply
/// env-var overrides.
///
/// # Errors
/// Returns `Config` if the file cannot be read or parsed, or an override is
/// invalid. A missing `CARDIO_CONFIG` target is an error; a missing default
/// file is not.
pub fn load() -> Result<Config> {
    let overrides = Overrides::from_env()?;
    match env::var("CARDIO_CONFIG").ok().filter(|v| !v.trim().is_empty()) {
        Some(path) => load_from(Some(Path::new(&path)), &overrides),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            load_from(default.exists().then_some(default), &overrides)
        }
    }
}

/// Internal loader: an explicit path (or built-in defaults) plus overrides.
///
/// # Errors
/// Returns `Config` if the file cannot be read or parsed, or the public key
/// file cannot be read.
pub fn load_from(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let raw = match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| {
                CardioError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            toml::from_str(&text).map_err(|e| {
                CardioError::Config(format!("parse error in {}: {e}", path.display()))
            })?
        }
        None => RawConfig::default(),
    };
    resolve(raw, overrides)
}

fn resolve(raw: RawConfig, overrides: &Overrides) -> Result<Config> {
    let signing_pubkey_b64 = match &overrides.signing_pubkey_b64_file {
        Some(path) => Some(
            fs::read_to_string(path)
                .map_err(|e| {
                    CardioError::Config(format!("cannot read public key {}: {e}", path.display()))
                })?
                .trim()
                .to_string(),
        ),
        None => raw.artifacts.signing_pubkey_b64,
    };

    let models = if raw.models.is_empty() {
        default_models()
    } else {
        raw.models
    };

    Ok(Config {
        artifacts: ArtifactsConfig {
            dir: overrides
                .artifact_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(raw.artifacts.dir)),
            layout: ArtifactLayout {
                scaler: raw.artifacts.scaler,
                summary_metrics: raw.artifacts.summary_metrics,
                detailed_metrics: raw.artifacts.detailed_metrics,
            },
            require_signed: overrides
                .require_signed
                .unwrap_or(raw.artifacts.require_signed),
            signing_pubkey_b64,
        },
        models,
        strict_startup: overrides.strict_startup.unwrap_or(raw.startup.strict),
        log: LogConfig {
            mode: overrides.log_mode.unwrap_or(raw.log.mode),
            file: overrides
                .log_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(raw.log.file)),
            filter: overrides
                .log_filter
                .clone()
                .unwrap_or(raw.log.filter),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use ed25519_dalek::SigningKey;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cardiorisk.toml");
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn test_builtin_defaults() {
        let config = load_from(None, &Overrides::default()).expect("defaults");
        assert_eq!(config.artifacts.dir, PathBuf::from("artifacts"));
        assert_eq!(config.artifacts.layout, ArtifactLayout::default());
        assert_eq!(config.models.len(), 6);
        assert_eq!(
            config.models.get("XGBoost").map(String::as_str),
            Some("models/xgboost_model.json")
        );
        assert!(!config.strict_startup);
        assert_eq!(config.log.mode, LogMode::Stderr);
    }

    #[test]
    fn test_shipped_default_file_matches_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = load_from(Some(&path), &Overrides::default()).expect("load");
        let builtin = load_from(None, &Overrides::default()).expect("defaults");
        assert_eq!(config, builtin);
    }

    #[test]
    fn test_file_values() {
        let temp = tempdir().expect("tempdir");
        let path = write_config(
            temp.path(),
            r#"
[artifacts]
dir = "/srv/cardio"
scaler = "scaler_v2.json"

[models]
"Logistic Regression" = "lr.json"

[startup]
strict = true

[log]
mode = "file"
file = "/var/log/cardio.log"
filter = "cardiorisk=debug"
"#,
        );

        let config = load_from(Some(&path), &Overrides::default()).expect("load");
        assert_eq!(config.artifacts.dir, PathBuf::from("/srv/cardio"));
        assert_eq!(config.artifacts.layout.scaler, "scaler_v2.json");
        assert_eq!(config.artifacts.layout.summary_metrics, "model_metrics.json");
        assert_eq!(config.models.len(), 1);
        assert!(config.strict_startup);
        assert_eq!(config.log.mode, LogMode::File);
        assert_eq!(config.log.filter, "cardiorisk=debug");
        assert!(config.startup_options().strict);
    }

    #[test]
    fn test_overrides_win() {
        let temp = tempdir().expect("tempdir");
        let path = write_config(temp.path(), "[startup]\nstrict = true\n");
        let overrides = Overrides {
            artifact_dir: Some(PathBuf::from("/tmp/artifacts")),
            log_mode: Some(LogMode::File),
            log_filter: Some("warn".into()),
            strict_startup: Some(false),
            ..Overrides::default()
        };

        let config = load_from(Some(&path), &overrides).expect("load");
        assert_eq!(config.artifacts.dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.log.mode, LogMode::File);
        assert_eq!(config.log.filter, "warn");
        assert!(!config.strict_startup);
    }

    #[test]
    fn test_unknown_keys_and_missing_file_fail() {
        let temp = tempdir().expect("tempdir");
        let path = write_config(temp.path(), "[artifacts]\ndirectory = \"x\"\n");
        assert!(matches!(
            load_from(Some(&path), &Overrides::default()),
            Err(CardioError::Config(_))
        ));

        let missing = temp.path().join("absent.toml");
        let err = load_from(Some(&missing), &Overrides::default()).expect_err("Must fail");
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_parse_flag_and_log_mode() {
        assert!(parse_flag("X", "yes").expect("flag"));
        assert!(!parse_flag("X", "0").expect("flag"));
        assert!(parse_flag("X", "maybe").is_err());
        assert_eq!("FILE".parse::<LogMode>().expect("mode"), LogMode::File);
        assert!("syslog".parse::<LogMode>().is_err());
    }

    #[test]
    fn test_integrity_policy() {
        let temp = tempdir().expect("tempdir");
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let pubkey_b64 =
            base64::engine::general_purpose::STANDARD.encode(signing.verifying_key().to_bytes());
        let key_file = temp.path().join("pubkey.b64");
        fs::write(&key_file, format!("{pubkey_b64}\n")).expect("write key");

        let overrides = Overrides {
            require_signed: Some(true),
            signing_pubkey_b64_file: Some(key_file),
            ..Overrides::default()
        };
        let config = load_from(None, &overrides).expect("load");
        let policy = config.integrity_policy().expect("policy");
        assert!(policy.require_signed);
        assert_eq!(policy.verifying_key, Some(signing.verifying_key()));

        let unsigned = Overrides {
            require_signed: Some(true),
            ..Overrides::default()
        };
        let config = load_from(None, &unsigned).expect("load");
        assert!(config.integrity_policy().is_err());
    }
}
