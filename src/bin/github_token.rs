//! Prints an installation access token for the merge bot's GitHub App.
//!
//! Useful for poking at the API with the same credentials the service uses.

use clap::Parser;
use std::path::PathBuf;

use merge_bot::github::GitHubApp;

#[derive(Parser)]
#[command(name = "github-token")]
#[command(about = "Mint a GitHub App installation token")]
struct Cli {
    /// Account the app is installed on (case sensitive)
    #[arg(long, default_value = "NixOS")]
    login: String,

    /// GitHub App id
    #[arg(long)]
    app_id: u64,

    /// PEM encoded app private key
    #[arg(long)]
    app_private_key_file: PathBuf,

    #[arg(long, default_value = "https://api.github.com")]
    api_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let pem = std::fs::read_to_string(&cli.app_private_key_file)?;
    let app = GitHubApp::new(&cli.api_url, cli.login, cli.app_id, &pem)?;
    let token = app.request_access_token().await?;
    println!("{}", token);
    Ok(())
}
