use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Run a one-shot completion through the `codex` CLI and return its stdout.
///
/// Codex CLI flags vary across versions, so a small set of invocations is
/// tried in order. `codex_args` (from config) go before the prompt, e.g.
/// `codex_args = ["-m", "gpt-5-codex"]`.
pub async fn run_codex(
    codex_command: &str,
    codex_args: &[String],
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    which::which(codex_command).with_context(|| {
        format!("`{codex_command}` not found on PATH; install Codex CLI or change llm.provider")
    })?;

    let candidates: Vec<Vec<String>> = vec![
        std::iter::once("exec".to_string())
            .chain(codex_args.iter().cloned())
            .chain(std::iter::once(prompt.to_string()))
            .collect(),
        codex_args
            .iter()
            .cloned()
            .chain(std::iter::once(prompt.to_string()))
            .collect(),
    ];

    let mut last_err: Option<anyhow::Error> = None;
    for args in candidates {
        match try_run(codex_command, &args, timeout).await {
            Ok(out) => return Ok(out),
            Err(e) => {
                tracing::debug!(error = %e, "codex invocation failed; trying next form");
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) => bail!(
            "Failed to run codex CLI.\n\
Tried: `{codex_command} exec <prompt>` and `{codex_command} <prompt>`.\n\
\nUnderlying error: {e}\n\
\nFix: run `codex --help` and set llm.codex_args in ~/.snaptask/config.toml (provider=codex-cli)."
        ),
        None => bail!("Failed to run codex CLI (unknown error)"),
    }
}

async fn try_run(cmd: &str, args: &[String], timeout: Duration) -> Result<String> {
    let child = tokio::process::Command::new(cmd)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning {cmd}"))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .with_context(|| format!("{cmd} timed out after {}s", timeout.as_secs()))?
        .context("waiting for codex")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("codex exited with {}. stderr: {stderr}", output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
