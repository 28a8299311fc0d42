//! Voice commands: utterance classification, the voice panel state machine
//! and the interpreter that ties recognition, dispatch and speech together.

use crate::action::Action;
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ClientResult};
use crate::render::sanitize;
use crate::speech::{SpeechEvent, SpeechRecognizer, SpeechSynthesizer};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

pub const HELP_PHRASES: &[&str] = &[
    "Can I leave classes?",
    "How am I doing?",
    "What should I focus on?",
    "Show my marks",
    "Check attendance",
];

pub const SPOKEN_LIMIT: usize = 200;
pub const SPOKEN_ERROR: &str = "An error occurred. Please try again.";

const SKIP_PHRASES: &[&str] = &["can i leave", "should i skip", "can i skip"];
const STANDING_PHRASES: &[&str] = &["how am i doing", "am i doing well"];
const FOCUS_PHRASES: &[&str] = &["what should i focus", "what to study"];
const EXAM_PHRASES: &[&str] = &["will i pass", "exam ready"];

/// Maps an utterance to an action. Rules are checked in priority order and
/// the first match wins; anything unmatched goes to chat verbatim.
pub fn classify(utterance: &str) -> Action {
    let lower = utterance.to_lowercase();

    if contains_any(&lower, SKIP_PHRASES) {
        Action::smart("attendance_advice")
    } else if contains_any(&lower, STANDING_PHRASES) {
        Action::smart("performance_overview")
    } else if contains_any(&lower, FOCUS_PHRASES) {
        Action::smart("focus_advisor")
    } else if contains_any(&lower, EXAM_PHRASES) {
        Action::smart("exam_prediction")
    } else if contains_any(&lower, &["marks", "score"]) {
        Action::direct("marks view")
    } else if lower.contains("attendance") {
        Action::direct("attendance calculator")
    } else if lower.contains("grade") {
        Action::direct("grades view")
    } else if lower.contains("cgpa") {
        Action::direct("cgpa view")
    } else if lower.contains("run all ai") {
        Action::ai("all")
    } else {
        Action::chat(utterance)
    }
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

/// The part of a result worth reading aloud: the first 200 UTF-16 units
/// with everything but ASCII word characters, whitespace and `.,!?` removed.
pub fn spoken_summary(text: &str) -> String {
    let mut units = 0;
    text.chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= SPOKEN_LIMIT
        })
        .filter(|c| {
            c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace() || ".,!?".contains(*c)
        })
        .collect()
}

fn engine_error_message(code: &str) -> String {
    match code {
        "no-speech" => "No speech detected. Try again!".to_string(),
        "not-allowed" => "Microphone access denied".to_string(),
        other => format!("Error: {}", other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleView {
    Help,
    Stopped,
    Result { transcript: String, text: String },
    Error(String),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceState {
    Idle(IdleView),
    Listening { interim: Option<String> },
    Processing { transcript: String },
}

/// Voice panel state. Every listening round gets a number; events and
/// results from an older round are ignored.
#[derive(Debug)]
pub struct VoicePanel {
    state: VoiceState,
    round: u64,
}

impl VoicePanel {
    pub fn new(supported: Result<(), String>) -> Self {
        Self {
            state: initial_state(supported),
            round: 0,
        }
    }

    /// Back to the opening view for a reopened panel. Round numbers keep
    /// counting so results from before the reopen stay stale.
    pub fn reopen(&mut self, supported: Result<(), String>) {
        self.round += 1;
        self.state = initial_state(supported);
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, VoiceState::Listening { .. })
    }

    /// Starts a round. Returns its number, or `None` when already busy or
    /// speech is unsupported.
    pub fn start(&mut self) -> Option<u64> {
        match &self.state {
            VoiceState::Idle(IdleView::Unsupported(_)) => None,
            VoiceState::Idle(_) => {
                self.round += 1;
                self.state = VoiceState::Listening { interim: None };
                Some(self.round)
            }
            _ => None,
        }
    }

    /// User stop while listening.
    pub fn cancel(&mut self) {
        if self.is_listening() {
            self.round += 1;
            self.state = VoiceState::Idle(IdleView::Stopped);
        }
    }

    /// Applies a recognizer event. Returns the transcript to process when the
    /// event finalized one.
    pub fn on_event(&mut self, round: u64, event: SpeechEvent) -> Option<String> {
        if round != self.round || !self.is_listening() {
            return None;
        }

        match event {
            SpeechEvent::Interim(text) => {
                self.state = VoiceState::Listening {
                    interim: Some(sanitize(&text)),
                };
                None
            }
            SpeechEvent::Final(text) => {
                let transcript = sanitize(&text);
                self.state = VoiceState::Processing {
                    transcript: transcript.clone(),
                };
                Some(transcript)
            }
            SpeechEvent::Error(code) => {
                self.state = VoiceState::Idle(IdleView::Error(engine_error_message(&code)));
                None
            }
            SpeechEvent::End => {
                self.state = VoiceState::Idle(IdleView::Stopped);
                None
            }
        }
    }

    /// Finishes a round that was processing.
    pub fn complete(&mut self, round: u64, result: &ClientResult<String>) -> bool {
        if round != self.round {
            return false;
        }
        let VoiceState::Processing { transcript } = &self.state else {
            return false;
        };

        self.state = VoiceState::Idle(match result {
            Ok(text) => IdleView::Result {
                transcript: transcript.clone(),
                text: sanitize(text),
            },
            Err(err) => IdleView::Error(sanitize(&err.to_string())),
        });
        true
    }
}

fn initial_state(supported: Result<(), String>) -> VoiceState {
    match supported {
        Ok(()) => VoiceState::Idle(IdleView::Help),
        Err(reason) => VoiceState::Idle(IdleView::Unsupported(reason)),
    }
}

/// Turns speech into backend actions and speaks a summary of the result.
#[derive(Clone)]
pub struct VoiceInterpreter {
    dispatcher: Dispatcher,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    locale: String,
    unsupported_reason: Option<String>,
}

impl VoiceInterpreter {
    pub fn new(
        dispatcher: Dispatcher,
        recognizer: ClientResult<Arc<dyn SpeechRecognizer>>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        locale: impl Into<String>,
    ) -> Self {
        let (recognizer, unsupported_reason) = match recognizer {
            Ok(recognizer) => (Some(recognizer), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            dispatcher,
            recognizer,
            synthesizer,
            locale: locale.into(),
            unsupported_reason,
        }
    }

    /// A fresh panel, in `Unsupported` when there is no recognizer.
    pub fn new_panel(&self) -> VoicePanel {
        VoicePanel::new(self.support())
    }

    pub fn reopen_panel(&self, panel: &mut VoicePanel) {
        panel.reopen(self.support());
    }

    fn support(&self) -> Result<(), String> {
        match &self.unsupported_reason {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    pub fn listen(&self) -> ClientResult<futures::stream::BoxStream<'static, SpeechEvent>> {
        match &self.recognizer {
            Some(recognizer) => recognizer.listen(&self.locale),
            None => Err(ClientError::Unsupported(
                self.unsupported_reason.clone().unwrap_or_default(),
            )),
        }
    }

    /// Classifies and dispatches `utterance`, then speaks a summary of the
    /// outcome. Speech does not delay the returned result.
    pub async fn interpret(&self, utterance: &str) -> ClientResult<String> {
        let action = classify(utterance);
        info!(%action, "voice command");

        let result = self.dispatcher.dispatch(&action).await;
        match &result {
            Ok(text) => self.synthesizer.speak(&spoken_summary(text)),
            Err(_) => self.synthesizer.speak(SPOKEN_ERROR),
        }
        result
    }

    /// Runs one full listening round on `panel`, calling `on_change` after
    /// every state transition.
    pub async fn listen_once<F>(&self, panel: &mut VoicePanel, mut on_change: F) -> ClientResult<()>
    where
        F: FnMut(&VoicePanel),
    {
        let Some(round) = panel.start() else {
            return match panel.state() {
                VoiceState::Idle(IdleView::Unsupported(reason)) => {
                    Err(ClientError::Unsupported(reason.clone()))
                }
                _ => Ok(()),
            };
        };
        on_change(panel);

        let mut events = match self.listen() {
            Ok(events) => events,
            Err(err) => {
                panel.on_event(round, SpeechEvent::Error(err.to_string()));
                on_change(panel);
                return Err(err);
            }
        };

        let mut transcript = None;
        while let Some(event) = events.next().await {
            debug!(?event, "speech event");
            if let Some(text) = panel.on_event(round, event) {
                transcript = Some(text);
            }
            on_change(panel);
            if !panel.is_listening() {
                break;
            }
        }
        drop(events);

        if panel.is_listening() {
            panel.on_event(round, SpeechEvent::End);
            on_change(panel);
        }

        if let Some(transcript) = transcript {
            let result = self.interpret(&transcript).await;
            panel.complete(round, &result);
            on_change(panel);
        }

        Ok(())
    }
}
