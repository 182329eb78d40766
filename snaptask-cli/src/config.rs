use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snaptask_core::{ConstraintPolicy, ReminderPolicy};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_snaptask_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub policy: ConstraintPolicy,
    pub reminders: RemindersSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "openai", "anthropic" or "codex-cli"
    pub provider: String,
    pub model: String,
    /// OpenAI-compatible endpoint root.
    pub base_url: String,
    pub temperature: f32,

    /// For provider = "codex-cli": command to execute (default: "codex")
    pub codex_command: Option<String>,
    /// For provider = "codex-cli": extra args to pass before the prompt
    pub codex_args: Option<Vec<String>>,

    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.2,
            codex_command: Some("codex".to_string()),
            codex_args: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersSection {
    /// IANA zone the schedule's wall-clock times are in.
    pub timezone: String,
    pub lead_minutes: i64,
    pub early_lead_minutes: i64,
    pub max_per_item: usize,
}

impl Default for RemindersSection {
    fn default() -> Self {
        let p = ReminderPolicy::default();
        Self {
            timezone: "America/Chicago".to_string(),
            lead_minutes: p.lead_minutes,
            early_lead_minutes: p.early_lead_minutes,
            max_per_item: p.max_per_item,
        }
    }
}

impl RemindersSection {
    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            max_per_item: self.max_per_item,
            lead_minutes: self.lead_minutes,
            early_lead_minutes: self.early_lead_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// EnvFilter directive used when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_snaptask_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Accept `openai/gpt-4o` style aliases and return the bare model id.
pub fn normalize_model(model: &str) -> String {
    model
        .rsplit_once('/')
        .map(|(_, m)| m)
        .unwrap_or(model)
        .to_string()
}
