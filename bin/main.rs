//! Command-line front end for composing messages from TOML drafts.
//!
//! - `render` prints the RFC 5322 message a draft produces
//! - `envelope` prints the SMTP envelope (reverse-path and recipients)
//! - `session` prints the resolved `mail.smtp.*` session properties

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use missive::{Draft, MessageBuilder};

/// Compose email messages from TOML drafts
#[derive(Parser, Debug)]
#[command(name = "missive")]
#[command(about = "Compose email messages from TOML drafts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the rendered message
    Render {
        /// Path to the draft
        draft: PathBuf,
    },
    /// Print the envelope sender and recipients
    Envelope {
        /// Path to the draft
        draft: PathBuf,
    },
    /// Print the resolved session properties
    Session {
        /// Path to the draft
        draft: PathBuf,

        /// Override the SMTP host from the draft
        #[arg(long)]
        host: Option<String>,
    },
}

fn load(path: &Path) -> anyhow::Result<MessageBuilder> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft from {}", path.display()))?;

    Draft::from_toml(&content)
        .and_then(Draft::into_builder)
        .with_context(|| format!("Invalid draft {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    missive::logging::init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Render { draft } => {
            let message = load(&draft)?.build()?;
            stdout.write_all(message.render().as_bytes())?;
        }
        Commands::Envelope { draft } => {
            let envelope = load(&draft)?.build()?.envelope();
            writeln!(stdout, "MAIL FROM:<{}>", envelope.sender().unwrap_or_default())?;
            for recipient in envelope.recipients() {
                writeln!(stdout, "RCPT TO:<{recipient}>")?;
            }
        }
        Commands::Session { draft, host } => {
            let mut builder = load(&draft)?;
            if let Some(host) = host {
                let mut config = builder.session().cloned().unwrap_or_default();
                config.host = Some(host);
                builder.set_session(config);
            }

            let session = builder.resolve_session()?;
            for (key, value) in session.properties() {
                writeln!(stdout, "{key}={value}")?;
            }
        }
    }

    Ok(())
}
