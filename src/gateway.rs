use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use tracing::warn;

/// Shown in place of an answer when the backend cannot be reached.
pub const FAILURE_MESSAGE: &str =
    "Failed to fetch Pokémon information. Please try again.";

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    // None must go over the wire as an explicit null
    conversation_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    answer: String,
    conversation_id: String,
}

/// One completed exchange as the conversation state consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub answer: String,
    pub conversation_id: String,
}

#[derive(Clone)]
pub struct PokeApiClient {
    client: Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Ask the backend about `text`, threading `conversation_id` when one
    /// exists so the server can keep multi-turn context.
    ///
    /// Never fails: any transport or decode failure collapses into a
    /// result carrying [`FAILURE_MESSAGE`] and the conversation id the
    /// caller passed in (empty when absent).
    pub async fn query(&self, text: &str, conversation_id: Option<&str>) -> QueryResult {
        match self.try_query(text, conversation_id).await {
            Ok(result) => result,
            Err(err) => {
                warn!("pokemon query failed: {:#}", err);
                QueryResult {
                    answer: FAILURE_MESSAGE.to_string(),
                    conversation_id: conversation_id.unwrap_or_default().to_string(),
                }
            }
        }
    }

    async fn try_query(&self, text: &str, conversation_id: Option<&str>) -> Result<QueryResult> {
        let url = format!("{}/pokemon", self.base_url);

        let request = QueryRequest {
            query: text,
            conversation_id,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "pokemon request failed with status: {}",
                response.status()
            ));
        }

        let decoded: QueryResponse = response.json().await?;
        Ok(QueryResult {
            answer: decoded.answer,
            conversation_id: decoded.conversation_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    /// Serve exactly one request with a canned response; hand back the base
    /// URL and a handle resolving to the raw request the client sent.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut data = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buf[..n]);
                if let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if data.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&data).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_body(raw: &str) -> serde_json::Value {
        let body = raw.split("\r\n\r\n").nth(1).unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn success_decodes_answer_and_conversation_id() {
        let body = r#"{"answer":"Pikachu is an Electric-type Pokémon.","conversation_id":"conv-1"}"#;
        let (base_url, server) = serve_once(http_response("200 OK", body)).await;

        let client = PokeApiClient::new(&base_url);
        let result = client.query("Pikachu", None).await;

        assert_eq!(result.answer, "Pikachu is an Electric-type Pokémon.");
        assert_eq!(result.conversation_id, "conv-1");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /pokemon "), "unexpected request line: {raw}");
        let sent = request_body(&raw);
        assert_eq!(sent["query"], "Pikachu");
        assert_eq!(sent["conversation_id"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn threads_existing_conversation_id() {
        let body = r#"{"answer":"Raichu evolves from Pikachu.","conversation_id":"conv-1"}"#;
        let (base_url, server) = serve_once(http_response("200 OK", body)).await;

        let client = PokeApiClient::new(&base_url);
        client.query("Raichu", Some("conv-1")).await;

        let sent = request_body(&server.await.unwrap());
        assert_eq!(sent["conversation_id"], "conv-1");
    }

    #[tokio::test]
    async fn non_2xx_status_falls_back() {
        let (base_url, server) =
            serve_once(http_response("500 Internal Server Error", "{}")).await;

        let client = PokeApiClient::new(&base_url);
        let result = client.query("Pikachu", Some("xyz")).await;

        assert_eq!(result.answer, FAILURE_MESSAGE);
        assert_eq!(result.conversation_id, "xyz");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_body_falls_back() {
        let (base_url, server) = serve_once(http_response("200 OK", "not json")).await;

        let client = PokeApiClient::new(&base_url);
        let result = client.query("Pikachu", Some("xyz")).await;

        assert_eq!(result.answer, FAILURE_MESSAGE);
        assert_eq!(result.conversation_id, "xyz");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn network_error_falls_back_with_empty_id() {
        // Grab a port nobody is listening on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PokeApiClient::new(&format!("http://{}", addr));
        let result = client.query("Pikachu", None).await;

        assert_eq!(result.answer, FAILURE_MESSAGE);
        assert_eq!(result.conversation_id, "");
    }
}
