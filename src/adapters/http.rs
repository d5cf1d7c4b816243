//! Collaborators reached over HTTP with `reqwest`.

use crate::domain::model::{PlaceOrderRequest, PlacedOrder, Product, ProductId};
use crate::domain::ports::{Catalog, MenuSearch, OrderPlacement, TextGenerator};
use crate::utils::error::{OrderChatError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

async fn expect_success(collaborator: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} answered {}: {}", collaborator, status, body);
    Err(OrderChatError::collaborator(
        collaborator,
        format!("HTTP {}", status.as_u16()),
    ))
}

fn with_auth(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.header("Authorization", format!("Bearer {}", key)),
        None => request,
    }
}

/// Catalog served as a JSON product array by `GET {endpoint}`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    endpoint: String,
}

impl HttpCatalog {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self) -> Result<Vec<Product>> {
        tracing::debug!("Fetching catalog from {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;
        let response = expect_success("catalog", response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn list_available_products(&self) -> Result<Vec<Arc<Product>>> {
        Ok(self
            .fetch()
            .await?
            .into_iter()
            .filter(|p| p.available)
            .map(Arc::new)
            .collect())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>> {
        Ok(self
            .fetch()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .map(Arc::new))
    }
}

/// Posts the order as JSON and reads back `{orderId, totalAmount}`.
#[derive(Debug, Clone)]
pub struct HttpOrderPlacement {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpOrderPlacement {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl OrderPlacement for HttpOrderPlacement {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
        let response = with_auth(self.client.post(&self.endpoint), self.api_key.as_deref())
            .json(&request)
            .send()
            .await?;
        let response = expect_success("order placement", response).await?;
        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Text generation against an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTextGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiTextGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn complete(&self, system_prompt: &str, context: &str, user_text: &str) -> Result<String> {
        let system = if context.is_empty() {
            system_prompt.to_string()
        } else {
            format!("{}\n\n{}", system_prompt, context)
        };
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: 0.7,
        };

        let response = with_auth(self.client.post(&self.endpoint), self.api_key.as_deref())
            .json(&body)
            .send()
            .await?;
        let response = expect_success("text generator", response).await?;
        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| OrderChatError::collaborator("text generator", "empty completion"))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

/// Menu retrieval: `POST {query, topK}` answered by a product array.
#[derive(Debug, Clone)]
pub struct HttpMenuSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMenuSearch {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl MenuSearch for HttpMenuSearch {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Arc<Product>>> {
        let request = self.client.post(&self.endpoint).json(&SearchRequest { query, top_k });
        let response = with_auth(request, self.api_key.as_deref()).send().await?;
        let response = expect_success("menu search", response).await?;
        let products: Vec<Product> = response.json().await?;
        Ok(products.into_iter().take(top_k).map(Arc::new).collect())
    }
}
