// ABOUTME: Login command implementation.
// ABOUTME: Validates a GitHub token against the API before storing it.

use omk::config::{Paths, Settings};
use omk::error::{Error, Result};
use omk::output::Output;
use omk::source::{CredentialStore, GitHubClient, SourceHost};
use std::io::IsTerminal;
use tokio::io::{AsyncBufReadExt, BufReader};

const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub async fn login(
    token: Option<String>,
    paths: &Paths,
    settings: &Settings,
    output: &Output,
) -> Result<()> {
    let token = match token.or_else(|| std::env::var(TOKEN_ENV).ok()) {
        Some(token) => token,
        None => read_token_from_stdin().await?,
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::MissingToken);
    }

    let client = GitHubClient::new(settings.github.api_url.clone())?;
    let identity = client.authenticate(token).await?;

    CredentialStore::new(paths.credentials_file()).save(token)?;

    let who = match identity.name {
        Some(ref name) if !name.is_empty() => format!("{} ({})", identity.login, name),
        _ => identity.login.clone(),
    };
    output.success(&format!("Logged in to GitHub as {}", who));
    Ok(())
}

async fn read_token_from_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        eprint!("GitHub token: ");
    }
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}
