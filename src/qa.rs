use crate::config::ModelConfig;
use crate::models::{ChatMessage, QueryAnswer};
use crate::openai::{OpenAiClient, OpenAiError};
use crate::sources::format_results;
use crate::store::SourceStore;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about tax \
evasion detection and speeding up audits using AI. Base your answers strictly on the \
provided sources.";

/// Runs the full query pipeline: provision the store, search it, render the
/// hits into a sources block, and ask the chat model for an answer.
#[derive(Clone)]
pub struct QaService {
    openai: OpenAiClient,
    store: SourceStore,
    models: ModelConfig,
}

impl QaService {
    pub fn new(openai: OpenAiClient, store: SourceStore, models: ModelConfig) -> Self {
        Self {
            openai,
            store,
            models,
        }
    }

    pub async fn answer(&self, query: &str) -> Result<QueryAnswer, OpenAiError> {
        if query.is_empty() {
            return Err(OpenAiError::EmptyQuery);
        }

        let store_id = self.store.ensure().await?;
        let hits = self.openai.search(&store_id, query).await?;
        let sources_used = hits.len();
        let sources = format_results(&hits);

        let answer = self.generate(&sources, query).await?;
        Ok(QueryAnswer {
            answer,
            sources_used,
        })
    }

    /// One attempt with the primary model; exactly one more with the
    /// fallback model when the primary is unavailable. Any other error
    /// propagates untouched.
    async fn generate(&self, sources: &str, query: &str) -> Result<String, OpenAiError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Sources: {sources}\n\nQuery: '{query}'\n\nPlease provide a concise, \
                 well-structured answer based on the sources provided."
            )),
        ];

        match self
            .openai
            .chat_completion(&self.models.answer_model, &messages)
            .await
        {
            Ok(answer) => Ok(answer),
            Err(err) if err.is_model_unavailable() => {
                tracing::warn!(
                    "model {} unavailable ({err}), falling back to {}",
                    self.models.answer_model,
                    self.models.fallback_model
                );
                self.openai
                    .chat_completion(&self.models.fallback_model, &messages)
                    .await
            }
            Err(err) => Err(err),
        }
    }
}
