//! Interactive first-time authorization (`gcalendar-mcp --setup`).
//!
//! Opens Google's consent page, catches the redirect on localhost, and
//! writes the resulting tokens to `./.tokens.json`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use gcalendar_core::token_store::project_token_path;
use gcalendar_core::{Settings, TokenStore};
use owo_colors::OwoColorize;

use crate::auth::{CredentialManager, OAuthClient};
use crate::callback::{CallbackReceiver, ListeningReceiver};

const RULE: &str = "===========================================";

pub async fn run(settings: &Settings) -> Result<()> {
    println!("\n{}", RULE);
    println!("  Google Calendar MCP - OAuth Setup");
    println!("{}\n", RULE);

    check_settings(settings)?;

    let manager = CredentialManager::new(
        OAuthClient::from(settings),
        TokenStore::at(project_token_path()),
    );

    let receiver = CallbackReceiver::from_redirect_uri(settings.redirect_uri())?
        .bind()
        .await?;
    let addr = receiver.local_addr()?;
    println!(
        "{}",
        format!("Callback server running at http://localhost:{}", addr.port()).blue()
    );

    let path = authorize(&manager, receiver, true).await?;

    println!("\n{}", format!("Tokens saved to: {}", path.display()).green());
    println!("\n{}", RULE);
    println!("  {}", "Setup Complete!".green().bold());
    println!("{}\n", RULE);
    println!("Next steps:");
    println!("  1. Build the server: cargo build --release");
    println!("  2. Add the gcalendar-mcp binary to your MCP client configuration\n");

    Ok(())
}

fn check_settings(settings: &Settings) -> Result<()> {
    println!("{}\n", "Checking environment variables...".blue());

    let missing = settings.missing_client_fields();
    for name in ["GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"] {
        if missing.contains(&name) {
            println!("{}", format!("Missing: {}", name).red());
        } else {
            println!("{}", format!("{}: Set", name).green());
        }
    }
    println!("{}\n", format!("Redirect URI: {}", settings.redirect_uri()).blue());

    if !missing.is_empty() {
        println!("{}", "Please configure your .env file with:".yellow());
        println!("  GOOGLE_CLIENT_ID=your-client-id.apps.googleusercontent.com");
        println!("  GOOGLE_CLIENT_SECRET=your-client-secret\n");
        println!("Then run this setup again.\n");
        bail!("Missing environment variables: {}", missing.join(", "));
    }

    println!("{}\n", "Environment variables verified!".green());
    Ok(())
}

/// Send the user through consent and persist the tokens Google returns.
///
/// The receiver must already be bound so the redirect cannot arrive before
/// anything is listening.
pub async fn authorize(
    manager: &CredentialManager,
    receiver: ListeningReceiver,
    open_browser: bool,
) -> Result<PathBuf> {
    let url = manager.authorization_url();

    if open_browser {
        println!("{}\n", "Opening browser for authentication...".blue());
        // Headless machines have no browser; the URL is printed below anyway
        if let Err(e) = open::that(&url) {
            println!("{}", format!("Could not open a browser: {}", e).yellow());
        }
    }
    println!("If the browser did not open, visit:\n{}\n", url);

    println!("{}\n", "Waiting for OAuth callback...".blue());
    let code = receiver.await_code().await?;

    println!("{}", "Exchanging authorization code for tokens...".blue());
    let record = manager
        .exchange_code(&code)
        .await
        .context("Failed to exchange authorization code")?;

    let path = manager.store().write(&record)?;
    tracing::info!(path = %path.display(), "Saved tokens");

    Ok(path)
}
