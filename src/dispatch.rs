use crate::action::Action;
use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{
    AI_FEATURES_PATH, CHAT_PATH, ChatRequest, EXECUTE_PATH, EXPORT_PATH, ExecuteRequest,
    ExportRequest, FeatureRequest, GEMINI_FEATURES_PATH, GeminiRequest, SMART_COMMAND_PATH,
    SmartCommandRequest,
};
use crate::session::SessionContext;
use serde_json::Value;
use tracing::{debug, warn};

/// Resolves an [`Action`] into its backend request flow and returns the
/// result as display text.
#[derive(Clone)]
pub struct Dispatcher {
    client: ApiClient,
    session: SessionContext,
}

impl Dispatcher {
    pub fn new(client: ApiClient, session: SessionContext) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn dispatch(&self, action: &Action) -> ClientResult<String> {
        debug!(%action, export = action.needs_export(), "dispatching");
        let result = self.run(action).await;
        if let Err(err) = &result {
            warn!(%action, error = %err, "action failed");
        }
        result
    }

    async fn run(&self, action: &Action) -> ClientResult<String> {
        match action {
            Action::DirectCommand { command } => self.execute(command).await,
            Action::AiFeature { feature } => {
                let ai_data = self.export().await?;
                let request = FeatureRequest {
                    ai_data,
                    feature: feature.clone(),
                };
                self.invoke(AI_FEATURES_PATH, &request, "AI failed").await
            }
            Action::GeminiFeature { feature, mode } => {
                let ai_data = self.export().await?;
                let request = GeminiRequest {
                    ai_data,
                    feature: feature.clone(),
                    mode: mode.clone(),
                };
                self.invoke(GEMINI_FEATURES_PATH, &request, "Gemini failed")
                    .await
            }
            Action::SmartCommand { name } => {
                let ai_data = self.export().await?;
                let request = SmartCommandRequest {
                    ai_data,
                    smart_type: name.clone(),
                };
                self.invoke(SMART_COMMAND_PATH, &request, "Smart command failed")
                    .await
            }
            Action::Chat { message } => self.chat(message).await,
        }
    }

    async fn execute(&self, command: &str) -> ClientResult<String> {
        let request = ExecuteRequest {
            session_id: self.session.session_id().to_string(),
            command: command.to_string(),
        };
        let envelope = self.client.post(EXECUTE_PATH, &request).await?;

        if envelope.success {
            Ok(envelope.output_text())
        } else {
            Err(ClientError::Command(envelope.error_or("Failed")))
        }
    }

    /// Exports the portal snapshot every AI-side call needs as `ai_data`.
    async fn export(&self) -> ClientResult<Value> {
        let request = ExportRequest {
            session_id: self.session.session_id().to_string(),
        };
        let envelope = self.client.post(EXPORT_PATH, &request).await?;

        if !envelope.success {
            return Err(ClientError::Export(envelope.error_or("Export failed")));
        }

        envelope
            .data
            .ok_or_else(|| ClientError::Export("Export returned no data".to_string()))
    }

    async fn invoke<B: serde::Serialize>(
        &self,
        path: &str,
        request: &B,
        fallback: &str,
    ) -> ClientResult<String> {
        let envelope = self.client.post(path, request).await?;

        if envelope.success {
            Ok(envelope.output_text())
        } else {
            Err(ClientError::Feature(envelope.error_or(fallback)))
        }
    }

    async fn chat(&self, message: &str) -> ClientResult<String> {
        let ai_data = self.export().await?;
        let request = ChatRequest {
            ai_data,
            message: message.to_string(),
        };
        let envelope = self.client.post(CHAT_PATH, &request).await?;

        if envelope.success {
            Ok(envelope.response_text())
        } else {
            Err(ClientError::Feature(envelope.error_or("Chat failed")))
        }
    }
}
