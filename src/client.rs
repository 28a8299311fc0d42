use crate::error::{ClientError, ClientResult};
use crate::protocol::{
    Envelope, LOGIN_PATH, LOGOUT_PATH, LoginRequest, LogoutRequest,
};
use reqwest::Client as HttpClient;
use serde::Serialize;
use tracing::{debug, info};

/// JSON-over-POST transport to the portal backend.
///
/// Every call is a single attempt; nothing is retried or cached.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            http: HttpClient::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs `body` to `path` and parses the response envelope.
    ///
    /// The backend reports failures with 4xx/5xx statuses that still carry a
    /// JSON `{error}` body, so the status is not treated as a transport
    /// failure. Only an unreachable server or a non-JSON body is.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<Envelope> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        serde_json::from_str::<Envelope>(&text).map_err(|err| {
            let snippet: String = text.chars().take(120).collect();
            ClientError::Network(format!(
                "invalid response from {} ({}): {} - {}",
                path, status, err, snippet
            ))
        })
    }

    /// Logs in to the portal and returns the backend-issued session id.
    pub async fn login(&self, username: String, password: String) -> ClientResult<String> {
        let envelope = self
            .post(LOGIN_PATH, &LoginRequest { username, password })
            .await?;

        if !envelope.success {
            return Err(ClientError::Command(envelope.error_or("Login failed")));
        }
        if let Some(message) = &envelope.message {
            info!(%message, "logged in");
        }

        envelope
            .session_id
            .ok_or_else(|| ClientError::Network("login response had no session_id".to_string()))
    }

    pub async fn logout(&self, session_id: &str) -> ClientResult<()> {
        let envelope = self
            .post(
                LOGOUT_PATH,
                &LogoutRequest {
                    session_id: session_id.to_string(),
                },
            )
            .await?;

        if envelope.success {
            Ok(())
        } else {
            Err(ClientError::Command(envelope.error_or("Logout failed")))
        }
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;
    use serde_json::json;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:5555/api/");
        assert_eq!(client.base_url(), "http://localhost:5555/api");
    }

    #[tokio::test]
    async fn error_status_with_json_body_is_an_envelope() {
        let backend = FakeBackend::start()
            .respond_status("/ai-features", 404, json!({"error": "Unknown feature: x"}))
            .await;
        let client = ApiClient::new(&backend.base_url());

        let envelope = client
            .post("/ai-features", &json!({"ai_data": {}, "feature": "x"}))
            .await
            .unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.error_or("AI failed"), "Unknown feature: x");
    }

    #[tokio::test]
    async fn non_json_body_is_a_network_error() {
        let backend = FakeBackend::start()
            .respond_raw("/execute", "<html>Internal Server Error</html>")
            .await;
        let client = ApiClient::new(&backend.base_url());

        let err = client
            .post("/execute", &json!({"session_id": "s", "command": "profile"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Network(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.post("/execute", &json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }

    #[tokio::test]
    async fn login_returns_backend_session_id() {
        let backend = FakeBackend::start()
            .respond(
                "/login",
                json!({"success": true, "session_id": "abc123", "message": "Login successful!"}),
            )
            .await;
        let client = ApiClient::new(&backend.base_url());

        let session_id = client
            .login("21BCE0001".to_string(), "secret".to_string())
            .await
            .unwrap();

        assert_eq!(session_id, "abc123");
        assert_eq!(
            backend.bodies("/login").await,
            vec![json!({"username": "21BCE0001", "password": "secret"})]
        );
    }

    #[tokio::test]
    async fn rejected_login_surfaces_backend_message() {
        let backend = FakeBackend::start()
            .respond_status(
                "/login",
                401,
                json!({"error": "Login failed. Check your credentials."}),
            )
            .await;
        let client = ApiClient::new(&backend.base_url());

        let err = client
            .login("u".to_string(), "p".to_string())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Login failed. Check your credentials.");
    }
}
