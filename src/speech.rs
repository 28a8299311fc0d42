//! Speech-to-text and text-to-speech engines.
//!
//! Both sides are external programs configured by command line:
//! - the recognizer prints one transcript per stdout line, either plain text
//!   (taken as final) or JSON `{"transcript": "...", "final": bool}`;
//! - the synthesizer receives the text to speak as its last argument
//!   (e.g. `espeak-ng`, `say`, `spd-say -w`).

use crate::error::{ClientError, ClientResult};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Partial transcript, may still change.
    Interim(String),
    /// Finalized transcript; recognition stops after it.
    Final(String),
    /// Raw engine error code or message.
    Error(String),
    /// The engine stopped.
    End,
}

pub trait SpeechRecognizer: Send + Sync {
    /// Starts one recognition round. Dropping the stream cancels it.
    fn listen(&self, locale: &str) -> ClientResult<BoxStream<'static, SpeechEvent>>;
}

pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text` without waiting, cancelling anything still playing.
    fn speak(&self, text: &str);

    fn cancel(&self);
}

pub fn recognizer_from_command(command: Option<&str>) -> ClientResult<Arc<dyn SpeechRecognizer>> {
    match command.and_then(CommandLine::parse) {
        Some(line) => Ok(Arc::new(CommandRecognizer { line })),
        None => Err(ClientError::Unsupported(
            "Voice recognition not supported: no speech-to-text command configured (VTOP_STT_COMMAND)"
                .to_string(),
        )),
    }
}

pub fn synthesizer_from_command(command: Option<&str>) -> Arc<dyn SpeechSynthesizer> {
    match command.and_then(CommandLine::parse) {
        Some(line) => Arc::new(CommandSynthesizer::new(line)),
        None => Arc::new(SilentSynthesizer),
    }
}

#[derive(Debug, Clone)]
struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        command
    }
}

pub struct CommandRecognizer {
    line: CommandLine,
}

#[derive(Debug, Deserialize)]
struct RecognizerLine {
    #[serde(default)]
    transcript: String,
    #[serde(default, rename = "final")]
    is_final: bool,
    #[serde(default)]
    error: Option<String>,
}

fn parse_line(line: &str) -> Option<SpeechEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<RecognizerLine>(line) {
            if let Some(code) = parsed.error {
                return Some(SpeechEvent::Error(code));
            }
            if parsed.transcript.is_empty() {
                return None;
            }
            return Some(if parsed.is_final {
                SpeechEvent::Final(parsed.transcript)
            } else {
                SpeechEvent::Interim(parsed.transcript)
            });
        }
    }

    Some(SpeechEvent::Final(line.to_string()))
}

impl SpeechRecognizer for CommandRecognizer {
    fn listen(&self, locale: &str) -> ClientResult<BoxStream<'static, SpeechEvent>> {
        let mut child = self
            .line
            .command()
            .env("VTOP_LOCALE", locale)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Unsupported("recognizer has no stdout".to_string()))?;
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("recognition cancelled");
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let Some(event) = parse_line(&line) else { continue };
                            if let SpeechEvent::Error(code) = &event {
                                error!(%code, "speech recognition error");
                            }
                            let stop = matches!(event, SpeechEvent::Final(_) | SpeechEvent::Error(_));
                            if tx.send(event).await.is_err() {
                                break;
                            }
                            if stop {
                                let _ = tx.send(SpeechEvent::End).await;
                                break;
                            }
                        }
                        Ok(None) => {
                            let _ = tx.send(SpeechEvent::End).await;
                            break;
                        }
                        Err(err) => {
                            error!(error = %err, "speech recognizer read failed");
                            let _ = tx.send(SpeechEvent::Error(err.to_string())).await;
                            let _ = tx.send(SpeechEvent::End).await;
                            break;
                        }
                    }
                }
            }
            let _ = child.start_kill();
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

pub struct CommandSynthesizer {
    line: CommandLine,
    current: Mutex<Option<Child>>,
}

impl CommandSynthesizer {
    fn new(line: CommandLine) -> Self {
        Self {
            line,
            current: Mutex::new(None),
        }
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str) {
        self.cancel();
        if text.trim().is_empty() {
            return;
        }

        let spawned = self
            .line
            .command()
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                if let Ok(mut current) = self.current.lock() {
                    *current = Some(child);
                }
            }
            Err(err) => warn!(program = %self.line.program, error = %err, "speech synthesis failed"),
        }
    }

    fn cancel(&self) {
        let previous = match self.current.lock() {
            Ok(mut current) => current.take(),
            Err(_) => None,
        };
        if let Some(mut child) = previous {
            let _ = child.start_kill();
        }
    }
}

/// Used when no synthesizer is configured; speech is skipped.
pub struct SilentSynthesizer;

impl SpeechSynthesizer for SilentSynthesizer {
    fn speak(&self, text: &str) {
        debug!(chars = text.len(), "no synthesizer configured, not speaking");
    }

    fn cancel(&self) {}
}
