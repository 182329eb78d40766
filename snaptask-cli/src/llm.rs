use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use snaptask_core::ReasoningOracle;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{self, AuthState, Secret};
use crate::codex_cli;
use crate::config::{normalize_model, LlmSection};

const SYSTEM_PROMPT: &str =
    "You are a careful scheduling assistant. Reply with a single JSON object and nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
    CodexCli,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "codex-cli" | "codex" => Ok(Provider::CodexCli),
            other => bail!("unknown llm.provider '{other}' (expected openai, anthropic or codex-cli)"),
        }
    }
}

/// Reasoning oracle backed by a hosted model or the Codex CLI.
#[derive(Debug, Clone)]
pub struct LlmOracle {
    provider: Provider,
    section: LlmSection,
    auth: AuthState,
}

impl LlmOracle {
    pub fn from_config(section: &LlmSection) -> Result<Self> {
        Ok(Self {
            provider: section.provider.parse()?,
            section: section.clone(),
            auth: auth::load_auth()?,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.section.timeout_secs.max(1))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.provider {
            Provider::Anthropic => self.anthropic_complete(prompt).await,
            Provider::OpenAI => self.openai_complete(prompt).await,
            Provider::CodexCli => {
                let cmd = self.section.codex_command.as_deref().unwrap_or("codex");
                let args = self.section.codex_args.clone().unwrap_or_default();
                let full = format!("{SYSTEM_PROMPT}\n\n{prompt}");
                codex_cli::run_codex(cmd, &args, &full, self.timeout()).await
            }
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .build()
            .context("build http client")
    }

    async fn anthropic_complete(&self, prompt: &str) -> Result<String> {
        let token = self
            .auth
            .get(Secret::AnthropicToken)
            .ok_or_else(|| Secret::AnthropicToken.missing())?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: String,
            max_tokens: i32,
            temperature: f32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: normalize_model(&self.section.model),
            max_tokens: 4096,
            temperature: self.section.temperature,
            system: SYSTEM_PROMPT,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let mut headers = HeaderMap::new();
        if token.starts_with("sk-ant-api") {
            headers.insert("x-api-key", HeaderValue::from_str(&token)?);
        } else {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client()?
            .post("https://api.anthropic.com/v1/messages")
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let text: String = out
            .content
            .into_iter()
            .filter(|b| b.t == "text")
            .filter_map(|b| b.text)
            .collect();
        Ok(text.trim().to_string())
    }

    async fn openai_complete(&self, prompt: &str) -> Result<String> {
        let key = self
            .auth
            .get(Secret::OpenAiKey)
            .ok_or_else(|| Secret::OpenAiKey.missing())?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            t: &'static str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: String,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: normalize_model(&self.section.model),
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.section.temperature,
            response_format: ResponseFormat { t: "json_object" },
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.section.base_url.trim_end_matches('/')
        );
        let resp = self
            .client()?
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

impl ReasoningOracle for LlmOracle {
    fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(provider = ?self.provider, model = %self.section.model, "calling model");
        // The CLI runs under #[tokio::main]; a nested block_on would panic, so
        // step out of the async context when a runtime is already running.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(self.complete(prompt)))
        } else {
            let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
            rt.block_on(self.complete(prompt))
        }
    }
}

/// Reads a previously captured oracle reply instead of calling a model.
#[derive(Debug, Clone)]
pub struct ReplayOracle {
    pub response: String,
}

impl ReasoningOracle for ReplayOracle {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("codex-cli".parse::<Provider>().unwrap(), Provider::CodexCli);
        assert_eq!("claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("gemini".parse::<Provider>().is_err());
    }
}
