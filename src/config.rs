use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:5555/api";
pub const DEFAULT_LOCALE: &str = "en-US";

#[derive(Debug, Parser)]
#[command(name = "vtop-deck", version, about = "Terminal dashboard for the VTOP portal backend")]
pub struct Cli {
    #[command(flatten)]
    pub config: ClientConfig,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the backend API
    #[arg(long, env = "VTOP_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Session id to use instead of a generated one (e.g. from `login`)
    #[arg(long, env = "VTOP_SESSION_ID", global = true)]
    pub session_id: Option<String>,

    /// Speech-to-text program; prints one transcript per line
    #[arg(long, env = "VTOP_STT_COMMAND", global = true)]
    pub stt_command: Option<String>,

    /// Text-to-speech program; receives the text as its last argument
    #[arg(long, env = "VTOP_TTS_COMMAND", global = true)]
    pub tts_command: Option<String>,

    /// Recognition locale passed to the speech-to-text program
    #[arg(long, env = "VTOP_LOCALE", default_value = DEFAULT_LOCALE, global = true)]
    pub locale: String,

    /// Log filter directive, e.g. `debug` or `vtop_deck=trace`
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "VTOP_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive dashboard (default)
    Dashboard,
    /// Run a portal command, e.g. `exec marks view`
    Exec {
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Run an offline AI feature
    Ai {
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(crate::dashboard::AI_FEATURES.iter().copied()))]
        feature: String,
    },
    /// Run a Gemini feature
    Gemini {
        feature: String,
        #[arg(long)]
        mode: Option<String>,
    },
    /// Run a smart command
    Smart {
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(crate::dashboard::SMART_COMMANDS.iter().copied()))]
        name: String,
    },
    /// Ask the chatbot one question
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Interpret a typed utterance as a voice command
    Ask {
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },
    /// Listen for one spoken command
    Listen,
    /// Log in and print the session id
    Login {
        #[arg(long, env = "VTOP_USERNAME")]
        username: String,
        #[arg(long, env = "VTOP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session given by --session-id
    Logout,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Command::Dashboard))
    }
}
