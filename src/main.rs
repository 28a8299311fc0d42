mod action;
mod chat;
mod client;
mod config;
mod dashboard;
mod dispatch;
mod error;
mod protocol;
mod render;
mod session;
mod speech;
mod ui;
mod voice;

#[cfg(test)]
mod test_support;

use action::Action;
use clap::Parser;
use client::ApiClient;
use config::{Cli, ClientConfig, Command};
use dashboard::{CardTarget, gemini_target};
use dispatch::Dispatcher;
use error::ClientError;
use session::SessionContext;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice::{IdleView, VoiceInterpreter, VoiceState};

type MainResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> MainResult<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.config, cli.is_interactive())?;

    let client = ApiClient::new(&cli.config.api_url);
    let session = SessionContext::new(cli.config.session_id.clone());
    info!(api = client.base_url(), session = session.session_id(), "starting");

    let dispatcher = Dispatcher::new(client, session);
    let voice = VoiceInterpreter::new(
        dispatcher.clone(),
        speech::recognizer_from_command(cli.config.stt_command.as_deref()),
        speech::synthesizer_from_command(cli.config.tts_command.as_deref()),
        cli.config.locale.clone(),
    );

    let action = match cli.command {
        None | Some(Command::Dashboard) => return ui::run_tui(dispatcher, voice),
        Some(Command::Exec { command }) => Action::direct(command.join(" ")),
        Some(Command::Ai { feature }) => Action::ai(feature),
        Some(Command::Gemini { feature, mode }) => match gemini_target(&feature, mode) {
            CardTarget::Run(action) => action,
            CardTarget::OpenChat => {
                return Err("`gemini chatbot` is interactive; use `chat <message>` or the dashboard".into());
            }
            CardTarget::OpenVoice => {
                return Err("`gemini voice` is interactive; use `listen` or the dashboard".into());
            }
        },
        Some(Command::Smart { name }) => Action::smart(name),
        Some(Command::Chat { message }) => Action::chat(message.join(" ")),
        Some(Command::Ask { utterance }) => {
            let text = voice.interpret(&utterance.join(" ")).await?;
            println!("{}", render::sanitize(&text));
            return Ok(());
        }
        Some(Command::Listen) => return listen(&voice).await,
        Some(Command::Login { username, password }) => {
            let session_id = dispatcher.client().login(username, password).await?;
            println!("{}", session_id);
            return Ok(());
        }
        Some(Command::Logout) => {
            if cli.config.session_id.is_none() {
                return Err("logout needs --session-id (or VTOP_SESSION_ID)".into());
            }
            dispatcher
                .client()
                .logout(dispatcher.session().session_id())
                .await?;
            return Ok(());
        }
    };

    let text = dispatcher.dispatch(&action).await?;
    println!("{}", render::sanitize(&text));
    Ok(())
}

async fn listen(voice: &VoiceInterpreter) -> MainResult<()> {
    let mut panel = voice.new_panel();
    voice
        .listen_once(&mut panel, |panel| match panel.state() {
            VoiceState::Listening { interim: None } => eprintln!("Listening... Speak now!"),
            VoiceState::Listening {
                interim: Some(text),
            } => eprintln!("  {}", text),
            VoiceState::Processing { transcript } => eprintln!("You said: \"{}\"", transcript),
            _ => {}
        })
        .await?;

    match panel.state() {
        VoiceState::Idle(IdleView::Result { text, .. }) => {
            println!("{}", text);
            Ok(())
        }
        VoiceState::Idle(IdleView::Error(message)) => Err(ClientError::Feature(message.clone()).into()),
        _ => Err("No speech detected. Try again!".into()),
    }
}

fn init_logging(config: &ClientConfig, interactive: bool) -> MainResult<()> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // Anything written to stderr would tear the dashboard.
        None if interactive => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
