use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::models::{ChatMessage, SearchHit};

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("Query is required")]
    EmptyQuery,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    #[error("file ingestion ended with status '{status}': {message}")]
    Ingestion { status: String, message: String },
    #[error("chat completion returned no choices")]
    NoChoices,
}

impl OpenAiError {
    /// True only for the errors that mean "this model id is not served
    /// here"; these are the ones worth retrying on a different model.
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            OpenAiError::Api { status, code, .. } => {
                *status == StatusCode::NOT_FOUND || code.as_deref() == Some("model_not_found")
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, OpenAiError> {
        self.api_key.as_deref().ok_or(OpenAiError::MissingApiKey)
    }

    pub async fn create_vector_store(&self, name: &str) -> Result<String, OpenAiError> {
        #[derive(Deserialize)]
        struct CreateResp {
            id: String,
        }

        let key = self.api_key()?;
        let response = self
            .client
            .post(format!("{}/vector_stores", self.base_url))
            .bearer_auth(key)
            .json(&json!({ "name": name }))
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<CreateResp>().await?.id)
    }

    pub async fn retrieve_vector_store(&self, store_id: &str) -> Result<(), OpenAiError> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/vector_stores/{}", self.base_url, store_id))
            .bearer_auth(key)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Uploads a file, attaches it to the vector store, and blocks until the
    /// service reports ingestion finished. Returns the service file id.
    pub async fn upload_and_poll(
        &self,
        store_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, OpenAiError> {
        #[derive(Deserialize)]
        struct FileResp {
            id: String,
        }

        #[derive(Deserialize)]
        struct StoreFileResp {
            #[serde(default)]
            status: String,
        }

        let key = self.api_key()?.to_string();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&key)
            .multipart(form)
            .send()
            .await?;
        let file_id = check_status(response).await?.json::<FileResp>().await?.id;

        let response = self
            .client
            .post(format!(
                "{}/vector_stores/{}/files",
                self.base_url, store_id
            ))
            .bearer_auth(&key)
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?;
        let mut status = check_status(response)
            .await?
            .json::<StoreFileResp>()
            .await?
            .status;

        while status == "in_progress" {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let response = self
                .client
                .get(format!(
                    "{}/vector_stores/{}/files/{}",
                    self.base_url, store_id, file_id
                ))
                .bearer_auth(&key)
                .send()
                .await?;
            status = check_status(response)
                .await?
                .json::<StoreFileResp>()
                .await?
                .status;
        }

        if status == "completed" {
            Ok(file_id)
        } else {
            Err(OpenAiError::Ingestion {
                status,
                message: format!("{filename} did not finish ingesting"),
            })
        }
    }

    /// Semantic search over an existing vector store. Ordering is whatever
    /// the service returns; no local re-ranking.
    pub async fn search(
        &self,
        store_id: &str,
        query: &str,
    ) -> Result<Vec<SearchHit>, OpenAiError> {
        #[derive(Deserialize)]
        struct SearchResp {
            #[serde(default)]
            data: Vec<SearchHit>,
        }

        if query.is_empty() {
            return Err(OpenAiError::EmptyQuery);
        }

        let key = self.api_key()?;
        let response = self
            .client
            .post(format!(
                "{}/vector_stores/{}/search",
                self.base_url, store_id
            ))
            .bearer_auth(key)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        Ok(check_status(response).await?.json::<SearchResp>().await?.data)
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenAiError> {
        #[derive(Deserialize)]
        struct CompletionResp {
            #[serde(default)]
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            #[serde(default)]
            content: String,
        }

        let key = self.api_key()?;
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&json!({ "model": model, "messages": messages }))
            .send()
            .await?;

        let completion = check_status(response)
            .await?
            .json::<CompletionResp>()
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(OpenAiError::NoChoices)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OpenAiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, code) = parse_error_body(&body);
    Err(OpenAiError::Api {
        status,
        message,
        code,
    })
}

fn parse_error_body(body: &str) -> (String, Option<String>) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ("<empty body>".to_string(), None);
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error") {
            let message = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or(trimmed)
                .to_string();
            let code = err
                .get("code")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            return (message, code);
        }
    }

    (trimmed.to_string(), None)
}
