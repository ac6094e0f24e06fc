use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::process::Command;
use tracing::debug;

/// Prefix marking a 1Password secret reference rather than a literal value.
pub const OP_REFERENCE_PREFIX: &str = "op://";

/// Fetch a secret from 1Password using the CLI
pub fn get_secret(reference: &str) -> Result<SecretString> {
    debug!("Fetching secret from 1Password: {}", reference);

    let output = Command::new("op")
        .arg("read")
        .arg(reference)
        .output()
        .context("Failed to execute 1Password CLI. Is it installed? Run: brew install 1password-cli")?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("1Password CLI error: {}", error.trim());
    }

    let secret = String::from_utf8(output.stdout)
        .context("Invalid UTF-8 in secret")?
        .trim()
        .to_string();

    if secret.is_empty() {
        anyhow::bail!("1Password reference {} resolved to an empty value", reference);
    }

    let secret = SecretString::from(secret);
    debug!("Successfully fetched secret ({})", describe_secret(&secret));
    Ok(secret)
}

/// Loggable stand-in for a credential: its length, never its characters.
pub fn describe_secret(secret: &SecretString) -> String {
    format!("{} chars", secret.expose_secret().chars().count())
}

/// First `max` characters of a body for diagnostics.
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    let rest = chars.count();
    if rest == 0 {
        head
    } else {
        format!("{head}… ({rest} more chars)")
    }
}
