/// Per-run client context: the opaque session identifier sent with every
/// session-scoped request.
///
/// Created once at startup and never persisted.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
}

impl SessionContext {
    /// Uses `explicit` when given (e.g. an id returned by `login`), otherwise
    /// generates one from the current timestamp.
    pub fn new(explicit: Option<String>) -> Self {
        let session_id = explicit
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_session_id);
        Self { session_id }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

fn generate_session_id() -> String {
    format!("auto-{}", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::SessionContext;

    #[test]
    fn generated_id_is_timestamp_based() {
        let session = SessionContext::new(None);
        let millis = session.session_id().strip_prefix("auto-").unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn explicit_id_is_kept() {
        let session = SessionContext::new(Some("abc123".to_string()));
        assert_eq!(session.session_id(), "abc123");
    }

    #[test]
    fn blank_explicit_id_is_replaced() {
        let session = SessionContext::new(Some("  ".to_string()));
        assert!(session.session_id().starts_with("auto-"));
    }
}
