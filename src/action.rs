use std::fmt;

/// What a card click or a voice utterance asks the backend to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A raw portal command such as `marks view`.
    DirectCommand { command: String },
    /// An offline analysis feature (`all` runs every one).
    AiFeature { feature: String },
    /// A Gemini-backed feature, optionally with a mode.
    GeminiFeature {
        feature: String,
        mode: Option<String>,
    },
    /// A pre-defined analytical query such as `attendance_advice`.
    SmartCommand { name: String },
    Chat { message: String },
}

impl Action {
    pub fn direct(command: impl Into<String>) -> Self {
        Action::DirectCommand {
            command: command.into(),
        }
    }

    pub fn ai(feature: impl Into<String>) -> Self {
        Action::AiFeature {
            feature: feature.into(),
        }
    }

    pub fn gemini(feature: impl Into<String>, mode: Option<String>) -> Self {
        Action::GeminiFeature {
            feature: feature.into(),
            mode,
        }
    }

    pub fn smart(name: impl Into<String>) -> Self {
        Action::SmartCommand { name: name.into() }
    }

    pub fn chat(message: impl Into<String>) -> Self {
        Action::Chat {
            message: message.into(),
        }
    }

    /// Whether the action needs an export before the real call.
    pub fn needs_export(&self) -> bool {
        !matches!(self, Action::DirectCommand { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::DirectCommand { command } => write!(f, "portal: {}", command),
            Action::AiFeature { feature } => write!(f, "ai: {}", feature),
            Action::GeminiFeature {
                feature,
                mode: Some(mode),
            } => write!(f, "gemini: {} ({})", feature, mode),
            Action::GeminiFeature { feature, mode: None } => write!(f, "gemini: {}", feature),
            Action::SmartCommand { name } => write!(f, "smart: {}", name),
            Action::Chat { message } => write!(f, "chat: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Action;

    #[test]
    fn only_direct_commands_skip_export() {
        assert!(!Action::direct("cgpa view").needs_export());
        assert!(Action::ai("all").needs_export());
        assert!(Action::gemini("insights", None).needs_export());
        assert!(Action::smart("focus_advisor").needs_export());
        assert!(Action::chat("hello").needs_export());
    }

    #[test]
    fn display_includes_gemini_mode() {
        let action = Action::gemini("study-guide", Some("quick".to_string()));
        assert_eq!(action.to_string(), "gemini: study-guide (quick)");
    }
}
