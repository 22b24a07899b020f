//! Command-line interface parsing and dispatch.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::{ReasoningEffort, ReasoningSummary};
use crate::core::config::Config;
use crate::logging;
use crate::relay;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "chinwag")]
#[command(about = "A terminal chat client with multiple persistent conversations")]
#[command(
    long_about = "Chinwag is a full-screen terminal chat client. Conversations are kept in \
independent sessions that persist across restarts; replies stream in as the \
model produces them. Requests go through a thin relay (`chinwag serve`) that \
fronts the hosted model.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message (Alt+Enter for a newline)\n\
  Ctrl+N            Start a new chat\n\
  Ctrl+X            Delete the current chat\n\
  Alt+Up/Down       Switch between chats\n\
  Up/Down/PgUp/PgDn Scroll the transcript\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Relay endpoint the client talks to
    #[arg(short, long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Ask the model for this reasoning effort
    #[arg(long, value_enum)]
    pub effort: Option<ReasoningEffort>,

    /// Ask the model for this reasoning summary style
    #[arg(long, value_enum)]
    pub summary: Option<ReasoningSummary>,

    /// Append debug logs to this file instead of the default location
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay proxy in front of the model provider
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,

        /// Inference endpoint to forward requests to
        #[arg(long, value_name = "URL")]
        upstream: Option<String>,

        /// Serve static assets from this directory
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },
}

pub async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mut config = Config::load()?;

    match args.command {
        Some(Commands::Serve {
            listen,
            upstream,
            static_dir,
        }) => {
            logging::init_stderr();
            if let Some(listen) = listen {
                config.relay.listen_addr = listen;
            }
            if let Some(upstream) = upstream {
                config.relay.upstream_url = upstream;
            }
            if let Some(static_dir) = static_dir {
                config.relay.static_dir = Some(static_dir);
            }
            relay::run_relay(config.relay).await
        }
        None => {
            let log_path = args
                .log
                .or(config.chat.log_file.clone())
                .unwrap_or_else(logging::default_log_path);
            logging::init_file(&log_path)?;

            if let Some(base_url) = args.base_url {
                config.chat.base_url = base_url;
            }
            if let Some(effort) = args.effort {
                config.chat.reasoning_effort = Some(effort);
            }
            if let Some(summary) = args.summary {
                config.chat.reasoning_summary = Some(summary);
            }
            run_chat(config.chat).await
        }
    }
}
