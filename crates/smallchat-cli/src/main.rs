//! SmallChat CLI - history inspection and admin maintenance
//!
//! Talks to the SmallChat HTTP API; admin commands use the stored API key.

mod api;
mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{Confirm, Password};

use api::{MessageResponse, SmallChatClient};
use config::Config;

#[derive(Parser)]
#[command(name = "smallchat")]
#[command(about = "SmallChat CLI - chat history inspection and maintenance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login and store API key
    Login {
        /// API key (will prompt if not provided)
        #[arg(short, long)]
        key: Option<String>,
        /// Server URL
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Show current configuration
    Config,

    /// Show store statistics
    Stats,

    /// List messages
    Messages {
        /// Only the newest N messages
        #[arg(short, long)]
        recent: Option<usize>,
        /// Hide JOIN/LEAVE messages
        #[arg(long)]
        no_system: bool,
    },

    /// Post a message (admin)
    Send {
        /// Message content
        content: String,
        /// Sender name
        #[arg(short, long)]
        sender: String,
        /// Message type (CHAT, JOIN, LEAVE)
        #[arg(short = 't', long)]
        r#type: Option<String>,
    },

    /// Clear the in-memory history (admin)
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Reload history from the durable store (admin)
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { key, url } => cmd_login(key, url).await,
        Commands::Config => cmd_config(),
        Commands::Stats => cmd_stats().await,
        Commands::Messages { recent, no_system } => cmd_messages(recent, !no_system).await,
        Commands::Send {
            content,
            sender,
            r#type,
        } => cmd_send(content, sender, r#type).await,
        Commands::Clear { yes } => cmd_clear(yes).await,
        Commands::Reload => cmd_reload().await,
    }
}

fn client(config: &Config) -> SmallChatClient {
    SmallChatClient::new(&config.base_url, config.api_key.as_deref())
}

fn admin_client(config: &Config) -> Result<SmallChatClient> {
    if config.api_key.is_none() {
        bail!("Not logged in. Run 'smallchat login' first.");
    }
    Ok(client(config))
}

// ============================================
// Command Implementations
// ============================================

async fn cmd_login(key: Option<String>, url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(url) = url {
        config.set_base_url(&url);
    }

    let api_key = match key {
        Some(k) => k,
        None => Password::new()
            .with_prompt("API Key")
            .interact()
            .context("Failed to read API key")?,
    };

    // Test connection
    let client = SmallChatClient::new(&config.base_url, Some(&api_key));
    print!("Testing connection to {}... ", config.base_url);

    match client.health().await {
        Ok(true) => {
            println!("{}", "OK".green());
        }
        _ => {
            println!("{}", "Failed".red());
            bail!("Could not connect to SmallChat API at {}", config.base_url);
        }
    }

    config.set_api_key(api_key);
    config.save()?;

    println!("{} API key saved to {:?}", "✓".green(), Config::config_path()?);

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration:".bold());
    println!("  Path: {:?}", Config::config_path()?);
    println!("  Base URL: {}", config.base_url);
    println!(
        "  API Key: {}",
        if config.api_key.is_some() {
            "Set".green()
        } else {
            "Not set".red()
        }
    );

    Ok(())
}

async fn cmd_stats() -> Result<()> {
    let config = Config::load()?;
    let stats = client(&config).stats().await?;

    println!("{}", "Stats:".bold());
    println!("  Messages: {}", stats.total_messages.to_string().cyan());
    println!("  Retention: {} days", stats.retention_days);
    println!(
        "  Persistence: {}",
        if stats.persistence_enabled {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );

    Ok(())
}

async fn cmd_messages(recent: Option<usize>, include_system: bool) -> Result<()> {
    let config = Config::load()?;
    let client = client(&config);

    let messages = match recent {
        Some(limit) => client.recent_messages(limit, include_system).await?,
        None => client.list_messages(include_system).await?,
    };

    if messages.is_empty() {
        println!("No messages.");
        return Ok(());
    }

    for message in &messages {
        println!("{}", format_message(message));
    }

    Ok(())
}

async fn cmd_send(content: String, sender: String, message_type: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let client = admin_client(&config)?;

    let message = client
        .send_message(&sender, &content, message_type.as_deref())
        .await?;

    println!(
        "{} Sent as {} [{}]",
        "✓".green(),
        message.sender.cyan(),
        message.message_type
    );
    println!("  {}", message.id.dimmed());

    Ok(())
}

async fn cmd_clear(yes: bool) -> Result<()> {
    let config = Config::load()?;
    let client = admin_client(&config)?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Clear the in-memory chat history?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    client.clear().await?;
    println!("{} History cleared", "✓".green());

    Ok(())
}

async fn cmd_reload() -> Result<()> {
    let config = Config::load()?;
    let client = admin_client(&config)?;

    let reloaded = client.reload().await?;
    println!(
        "{} Reloaded {} messages from the durable store",
        "✓".green(),
        reloaded.loaded.to_string().cyan()
    );

    Ok(())
}

/// One line per message: time, sender, content (system events dimmed)
fn format_message(message: &MessageResponse) -> String {
    let time = message.timestamp.format("%Y-%m-%d %H:%M:%S");
    let content = truncate_string(&message.content, 120);

    if message.is_system() {
        return format!("{} {}", time.to_string().dimmed(), content.dimmed());
    }

    let reply = message
        .reply_to_sender
        .as_deref()
        .map(|s| format!(" ↪ {}", s))
        .unwrap_or_default();

    format!(
        "{} {}{}: {}",
        time.to_string().dimmed(),
        message.sender.cyan().bold(),
        reply.dimmed(),
        content
    )
}

/// Truncate string safely for UTF-8 (by char count, not bytes)
fn truncate_string(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        format!("{}...", chars.into_iter().collect::<String>())
    } else {
        s.to_string()
    }
}
