//! OpenAI-compatible provider implementation.
//!
//! Talks to `/v1/chat/completions` (non-streaming) and `/v1/embeddings` on any
//! server that speaks the OpenAI wire format.

use super::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible HTTP API provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        endpoint(&self.base_url, path)
    }
}

/// Joins `path` onto a base URL that may or may not already end in a version
/// segment such as `/v1`.
fn endpoint(base_url: &str, path: &str) -> String {
    let has_version = base_url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.strip_prefix('v'))
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));

    if has_version {
        format!("{}/{}", base_url, path)
    } else {
        format!("{}/v1/{}", base_url, path)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let body = CompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        let response = self.http_client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed = response.json::<CompletionResponse>().await?;
        let content = first_choice_content(parsed)?;

        callback(ChatResponse {
            model: request.model,
            content,
            done: true,
        });

        Ok(())
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let embed_request = EmbedRequest {
            model: model.to_string(),
            input: text.to_string(),
        };

        let response = self.http_client
            .post(self.endpoint("embeddings"))
            .bearer_auth(self.api_key.trim())
            .json(&embed_request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed = response.json::<EmbeddingResponse>().await?;
        parsed.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }
}

fn first_choice_content(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ProviderError::Other("Completion contained no content".to_string()))
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_host_base_uses_v1() {
        assert_eq!(
            endpoint("https://api.openai.com", "embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn endpoint_from_versioned_base_appends_once() {
        assert_eq!(
            endpoint("https://llm.example.edu/v1", "chat/completions"),
            "https://llm.example.edu/v1/chat/completions"
        );
        assert_eq!(
            endpoint("https://open.bigmodel.cn/api/paas/v4", "embeddings"),
            "https://open.bigmodel.cn/api/paas/v4/embeddings"
        );
    }

    #[test]
    fn completion_request_wire_shape() {
        let messages = vec![Message::system("be brief"), Message::user("What is a cell?")];
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "What is a cell?");
    }

    #[test]
    fn first_choice_content_extracts_text() {
        let parsed: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"A cell is..."}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_content(parsed).unwrap(), "A cell is...");
    }

    #[test]
    fn first_choice_content_rejects_empty() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_choice_content(parsed).is_err());

        let parsed: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap();
        assert!(first_choice_content(parsed).is_err());
    }

    #[test]
    fn embedding_response_parses() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, -0.25]);
    }
}
