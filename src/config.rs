//! Load and validate runtime configuration.

use chrono_tz::Tz;
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::Path};

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DiscordCfg {
    /// Register commands to this guild only; `None` means global sync.
    pub guild_id: Option<u64>,
}

/// Where the service-account key comes from.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CredentialSource {
    File { path: String },
    Env { var: String },
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::File {
            path: "service_account.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SheetsCfg {
    pub spreadsheet_id: String,
    pub worksheet_name: String,
    pub credentials: CredentialSource,
}

impl Default for SheetsCfg {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            worksheet_name: "TradingJournal".to_string(),
            credentials: CredentialSource::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JournalCfg {
    pub timezone: String, // IANA name, e.g. "Asia/Makassar"
}

impl Default for JournalCfg {
    fn default() -> Self {
        Self {
            timezone: "Asia/Makassar".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeepAliveCfg {
    pub enabled: bool,
    pub bind: String,
}

impl Default for KeepAliveCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordCfg,
    pub sheets: SheetsCfg,
    pub journal: JournalCfg,
    pub keepalive: KeepAliveCfg,
}

impl AppConfig {
    /// Read the YAML file if present, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut cfg: Self = if path.exists() {
            let s = fs::read_to_string(path)?;
            serde_yaml::from_str(&s)?
        } else {
            Self::default()
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = v;
        }
        if let Some(v) = get("WORKSHEET_NAME") {
            self.sheets.worksheet_name = v;
        }
        if let Some(v) = get("TZ") {
            self.journal.timezone = v;
        }
        if let Some(v) = get("GUILD_ID") {
            self.discord.guild_id = parse_guild_id(&v);
        }
        if let Some(v) = get("GOOGLE_CREDENTIALS_ENV") {
            self.sheets.credentials = CredentialSource::Env { var: v };
        }
        if let Some(port) = get("PORT") {
            self.keepalive.enabled = true;
            self.keepalive.bind = format!("0.0.0.0:{}", port.trim());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheets.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid("missing SPREADSHEET_ID".into()));
        }
        if self.sheets.worksheet_name.trim().is_empty() {
            return Err(ConfigError::Invalid("worksheet name is empty".into()));
        }
        self.timezone()?;
        if self.keepalive.enabled {
            self.keepalive_addr()?;
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.journal
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown time zone '{}'", self.journal.timezone)))
    }

    pub fn keepalive_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.keepalive
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad keep-alive bind '{}'", self.keepalive.bind)))
    }
}

/// Digits only and non-zero, otherwise global registration.
pub fn parse_guild_id(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|id| *id != 0)
}
