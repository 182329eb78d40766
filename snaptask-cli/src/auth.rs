//! Model credentials kept in `~/.snaptask/auth.json`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::state::ensure_snaptask_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_token: Option<String>,
}

/// Which credential a command reads or stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    OpenAiKey,
    AnthropicToken,
}

impl Secret {
    fn label(self) -> &'static str {
        match self {
            Secret::OpenAiKey => "OpenAI API key",
            Secret::AnthropicToken => "Anthropic token",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Secret::OpenAiKey => "sk-",
            Secret::AnthropicToken => "sk-ant-",
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            Secret::OpenAiKey => "OPENAI_API_KEY",
            Secret::AnthropicToken => "ANTHROPIC_API_KEY",
        }
    }

    fn command(self) -> &'static str {
        match self {
            Secret::OpenAiKey => "snaptask auth paste-openai-api-key",
            Secret::AnthropicToken => "snaptask auth paste-anthropic-token",
        }
    }

    /// Error for a provider call made without this credential.
    pub fn missing(self) -> anyhow::Error {
        anyhow::anyhow!(
            "no {} configured; set {} or run: {}",
            self.label(),
            self.env_var(),
            self.command()
        )
    }
}

impl AuthState {
    fn slot(&mut self, which: Secret) -> &mut Option<String> {
        match which {
            Secret::OpenAiKey => &mut self.openai_api_key,
            Secret::AnthropicToken => &mut self.anthropic_token,
        }
    }

    fn stored(&self, which: Secret) -> Option<&String> {
        match which {
            Secret::OpenAiKey => self.openai_api_key.as_ref(),
            Secret::AnthropicToken => self.anthropic_token.as_ref(),
        }
    }

    /// The environment variable wins over the stored value.
    pub fn get(&self, which: Secret) -> Option<String> {
        std::env::var(which.env_var())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.stored(which).cloned())
    }
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_snaptask_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let raw = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", p.display()))
}

fn save_auth(auth: &AuthState) -> Result<PathBuf> {
    let p = auth_path()?;
    fs::write(&p, serde_json::to_string_pretty(auth)?)
        .with_context(|| format!("write {}", p.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&p, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("chmod {}", p.display()))?;
    }
    Ok(p)
}

/// Trimmed `value`, if it carries the prefix expected for `which`.
pub fn check_secret(which: Secret, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("no {} entered", which.label());
    }
    if !value.starts_with(which.prefix()) {
        bail!(
            "that does not look like an {} (expected prefix {})",
            which.label(),
            which.prefix()
        );
    }
    Ok(value.to_string())
}

fn read_line(input: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("read stdin")?;
    Ok(line)
}

/// Prompt for a credential on stdin and store it.
pub fn paste(which: Secret) -> Result<()> {
    print!("Paste {} (starts with {}): ", which.label(), which.prefix());
    io::stdout().flush().ok();
    let value = check_secret(which, &read_line(&mut io::stdin().lock())?)?;

    let mut auth = load_auth()?;
    *auth.slot(which) = Some(value);
    let p = save_auth(&auth)?;
    println!("Saved {} to {}", which.label(), p.display());
    Ok(())
}

/// `sk-abc…wxyz` style display for `config show`.
pub fn mask(secret: Option<&str>) -> String {
    match secret {
        None => "<not set>".to_string(),
        Some(s) if s.chars().count() <= 10 => "<set>".to_string(),
        Some(s) => {
            let head: String = s.chars().take(6).collect();
            let tail: String = s.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("{head}…{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_middle() {
        assert_eq!(mask(None), "<not set>");
        assert_eq!(mask(Some("short")), "<set>");
        assert_eq!(mask(Some("sk-ant-0123456789abcd")), "sk-ant…abcd");
    }

    #[test]
    fn check_secret_trims_and_validates_prefix() {
        assert_eq!(
            check_secret(Secret::AnthropicToken, "  sk-ant-abc\n").unwrap(),
            "sk-ant-abc"
        );
        assert!(check_secret(Secret::AnthropicToken, "sk-abc").is_err());
        assert!(check_secret(Secret::OpenAiKey, "\n").is_err());
        assert!(check_secret(Secret::OpenAiKey, "sk-proj-1").is_ok());
    }

    #[test]
    fn read_line_keeps_first_line() {
        let mut input = io::Cursor::new("sk-first\nsk-second\n");
        assert_eq!(read_line(&mut input).unwrap(), "sk-first\n");
    }

    #[test]
    fn stored_value_round_trips_through_json() {
        let mut auth = AuthState::default();
        *auth.slot(Secret::OpenAiKey) = Some("sk-stored".to_string());
        let json = serde_json::to_string(&auth).unwrap();
        assert!(!json.contains("anthropic_token"));
        let back: AuthState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stored(Secret::OpenAiKey).map(String::as_str), Some("sk-stored"));
        assert_eq!(back.stored(Secret::AnthropicToken), None);
    }
}
