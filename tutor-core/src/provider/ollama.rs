//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the Provider trait.

use super::types::*;
use async_trait::async_trait;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider for the given server (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.base_url);

        let ollama_request = OllamaChatRequest::from(request);

        let response = self.http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();
                if let Some(response) = parse_stream_line(&line)? {
                    callback(response);
                }
            }
        }

        // final line without a trailing newline
        if let Some(response) = parse_stream_line(&buffer)? {
            callback(response);
        }

        Ok(())
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);

        let embed_request = EmbedRequest {
            model: model.to_string(),
            input: text.to_string(),
        };

        let response = self.http_client
            .post(&url)
            .json(&embed_request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let embed_response = response.json::<OllamaEmbedResponse>().await?;

        embed_response.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }
}

/// Parses one NDJSON line of a streamed `/api/chat` response.
///
/// Blank lines yield `Ok(None)`. Ollama reports failures that happen after
/// the 200 status as an `{"error": ...}` line; those, and lines that are not
/// chat chunks at all, end the stream with an error.
fn parse_stream_line(line: &[u8]) -> Result<Option<ChatResponse>> {
    let line_str = String::from_utf8_lossy(line);
    let line_str = line_str.trim();
    if line_str.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<OllamaStreamLine>(line_str)? {
        OllamaStreamLine::Error { error } => Err(ProviderError::Other(format!("Ollama stream error: {}", error))),
        OllamaStreamLine::Chunk(chunk) => Ok(Some(ChatResponse {
            model: chunk.model,
            content: chunk.message.content,
            done: chunk.done,
        })),
    }
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<String, serde_json::Value>>,
    stream: bool,
}

impl From<ChatRequest> for OllamaChatRequest {
    fn from(request: ChatRequest) -> Self {
        let mut options = HashMap::new();
        options.insert("temperature".to_string(), serde_json::json!(request.temperature));

        Self {
            model: request.model,
            messages: request.messages.into_iter().map(|m| OllamaMessage {
                role: m.role,
                content: m.content,
            }).collect(),
            options: Some(options),
            stream: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatResponse {
    model: String,
    #[serde(default)]
    created_at: String,
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    done_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OllamaStreamLine {
    Error { error: String },
    Chunk(OllamaChatResponse),
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_carries_temperature() {
        let request = ChatRequest::new("llama3.2", vec![Message::user("hi")])
            .with_temperature(0.3);
        let ollama = OllamaChatRequest::from(request);

        assert!(ollama.stream);
        assert_eq!(ollama.messages[0].role, "user");
        let options = ollama.options.unwrap();
        assert_eq!(options["temperature"], serde_json::json!(0.3));
    }

    #[test]
    fn test_parse_stream_line() {
        let line = br#"{"model":"llama3.2","message":{"role":"assistant","content":"Photo"},"done":false}
"#;
        let chunk = parse_stream_line(line).unwrap().unwrap();
        assert_eq!(chunk.content, "Photo");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_stream_line_skips_blank() {
        assert!(parse_stream_line(b"\n").unwrap().is_none());
        assert!(parse_stream_line(b"   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_stream_line_rejects_error_and_garbage() {
        let err = parse_stream_line(br#"{"error":"llama runner process has terminated"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Other(msg) if msg.contains("llama runner")));
        assert!(matches!(parse_stream_line(b"not json\n"), Err(ProviderError::Json(_))));
    }

    /// Serves one canned HTTP response on a local port and returns its base URL.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_chat_fails_on_mid_stream_error() {
        let url = serve_once(concat!(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Photosynthesis happens in"},"done":false}"#,
            "\n",
            r#"{"error":"llama runner process has terminated"}"#,
            "\n",
        ))
        .await;
        let provider = OllamaProvider::new(url);

        let mut received = String::new();
        let result = provider
            .chat(
                ChatRequest::new("llama3.2", vec![Message::user("Where?")]),
                Box::new(|chunk: ChatResponse| received.push_str(&chunk.content)),
            )
            .await;

        assert!(matches!(result, Err(ProviderError::Other(_))));
        assert_eq!(received, "Photosynthesis happens in");
    }

    #[tokio::test]
    async fn test_chat_streams_until_done() {
        let url = serve_once(concat!(
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"Chloro"},"done":false}"#,
            "\n",
            r#"{"model":"llama3.2","message":{"role":"assistant","content":"plasts"},"done":true}"#,
        ))
        .await;
        let provider = OllamaProvider::new(url);

        let mut received = String::new();
        provider
            .chat(
                ChatRequest::new("llama3.2", vec![Message::user("Where?")]),
                Box::new(|chunk: ChatResponse| received.push_str(&chunk.content)),
            )
            .await
            .unwrap();

        assert_eq!(received, "Chloroplasts");
    }

    #[test]
    fn test_embed_response_defaults_to_empty() {
        let parsed: OllamaEmbedResponse = serde_json::from_str(r#"{"model":"nomic"}"#).unwrap();
        assert!(parsed.embeddings.is_empty());
    }
}
