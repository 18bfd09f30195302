// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_AUTOSAVE_DEBOUNCE: &str = "1600ms";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub autosave_debounce: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            autosave_debounce: Some(DEFAULT_AUTOSAVE_DEBOUNCE.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("INTAKE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set INTAKE_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(intake_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [storage] and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            intake_db::validate_db_path(db_path)?;
        }

        if let Some(debounce) = &self.ui.autosave_debounce {
            let parsed = parse_duration(debounce)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "ui.autosave_debounce in {} must be positive, got {}",
                    path.display(),
                    debounce
                );
            }
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => intake_db::default_db_path(),
        }
    }

    pub fn autosave_debounce(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .autosave_debounce
                .as_deref()
                .unwrap_or(DEFAULT_AUTOSAVE_DEBOUNCE),
        )
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# intake config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/intake/intake.db)\n# db_path = \"/absolute/path/to/intake.db\"\n\n[ui]\nautosave_debounce = \"{}\"\n",
            path.display(),
            DEFAULT_AUTOSAVE_DEBOUNCE,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 1600ms or 2s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.autosave_debounce()?, Duration::from_millis(1600));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nautosave_debounce = \"2s\"\n")?;

        let error = Config::load(&path).expect_err("unversioned schema should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage] and [ui]"));
        Ok(())
    }

    #[test]
    fn versioned_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"/tmp/intake-test.db\"\n[ui]\nautosave_debounce = \"2s\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.db_path()?, PathBuf::from("/tmp/intake-test.db"));
        assert_eq!(config.autosave_debounce()?, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn unsupported_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 7\n")?;
        let error = Config::load(&path).expect_err("future version should fail");
        assert!(error.to_string().contains("unsupported config version 7"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn uri_style_db_path_is_rejected() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"file:intake.db?mode=memory\"\n",
        )?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn zero_debounce_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nautosave_debounce = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero debounce should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn parse_duration_accepts_all_suffixes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("fast").is_err());
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;

        let config = Config::load(&path)?;
        assert_eq!(config.version, 1);
        assert_eq!(config.autosave_debounce()?, Duration::from_millis(1600));
        Ok(())
    }
}
