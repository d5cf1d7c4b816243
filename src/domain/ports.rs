use crate::domain::model::{PlaceOrderRequest, PlacedOrder, Product, ProductId};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read path over the product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_available_products(&self) -> Result<Vec<Arc<Product>>>;
    async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>>;
}

#[async_trait]
pub trait OrderPlacement: Send + Sync {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder>;
}

/// Free-text generation (LLM). Only used for menu questions and the free-form fallback.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system_prompt: &str, context: &str, user_text: &str) -> Result<String>;
}

/// Similarity search over the menu, an alternate lookup path next to fuzzy matching.
#[async_trait]
pub trait MenuSearch: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Arc<Product>>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl<T: Catalog + ?Sized> Catalog for Arc<T> {
    async fn list_available_products(&self) -> Result<Vec<Arc<Product>>> {
        (**self).list_available_products().await
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>> {
        (**self).find_product(id).await
    }
}

#[async_trait]
impl<T: OrderPlacement + ?Sized> OrderPlacement for Arc<T> {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
        (**self).place_order(request).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn complete(&self, system_prompt: &str, context: &str, user_text: &str) -> Result<String> {
        (**self).complete(system_prompt, context, user_text).await
    }
}
