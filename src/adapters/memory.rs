use crate::domain::model::{OrderId, PlaceOrderRequest, PlacedOrder, Product, ProductId};
use crate::domain::ports::{Catalog, OrderPlacement, TextGenerator};
use crate::utils::error::{OrderChatError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Catalog over a fixed product list, in the order given.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Arc<Product>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_available_products(&self) -> Result<Vec<Arc<Product>>> {
        Ok(self
            .products
            .iter()
            .filter(|p| p.available)
            .cloned()
            .collect())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>> {
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }
}

/// Order placement that keeps placed orders in memory and numbers them from 1.
#[derive(Debug)]
pub struct InMemoryOrderBook {
    next_id: AtomicI64,
    placed: Mutex<Vec<(PlacedOrder, PlaceOrderRequest)>>,
}

impl Default for InMemoryOrderBook {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            placed: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<(PlacedOrder, PlaceOrderRequest)> {
        self.placed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn find(&self, order_id: OrderId) -> Option<PlaceOrderRequest> {
        self.orders()
            .into_iter()
            .find(|(placed, _)| placed.order_id == order_id)
            .map(|(_, request)| request)
    }
}

#[async_trait]
impl OrderPlacement for InMemoryOrderBook {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
        if request.items.is_empty() {
            return Err(OrderChatError::collaborator(
                "order placement",
                "order has no items",
            ));
        }

        let total_amount: f64 = request
            .items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum();
        let placed = PlacedOrder {
            order_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            total_amount,
        };

        tracing::info!(
            "🧾 Recorded order #{} with {} line(s)",
            placed.order_id,
            request.items.len()
        );
        self.placed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((placed.clone(), request));
        Ok(placed)
    }
}

/// Text generator for running without a language model: replies with the
/// prepared context, so menu questions still get the formatted menu.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTextGenerator;

#[async_trait]
impl TextGenerator for OfflineTextGenerator {
    async fn complete(&self, _system_prompt: &str, context: &str, _user_text: &str) -> Result<String> {
        Ok(context.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OrderLineRequest;

    fn line(product_id: ProductId, quantity: u32, unit_price: f64) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
            unit_price,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_catalog_lists_only_available_products() {
        let catalog = InMemoryCatalog::new(vec![
            Product::new(1, "Cà phê đen", "Cà phê", 25000.0),
            Product::new(2, "Trà đào", "Trà", 35000.0).unavailable(),
        ]);

        let available = catalog.list_available_products().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, 1);

        let sold_out = catalog.find_product(2).await.unwrap().unwrap();
        assert!(!sold_out.available);
        assert!(catalog.find_product(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_book_numbers_orders_and_sums_lines() {
        let book = InMemoryOrderBook::new();
        let request = PlaceOrderRequest {
            table_number: Some("3".to_string()),
            items: vec![line(1, 2, 25000.0), line(2, 1, 35000.0)],
        };

        let first = book.place_order(request.clone()).await.unwrap();
        let second = book.place_order(request).await.unwrap();

        assert_eq!(first.order_id, 1);
        assert_eq!(first.total_amount, 85000.0);
        assert_eq!(second.order_id, 2);
        assert_eq!(book.orders().len(), 2);
        assert_eq!(book.find(2).unwrap().table_number.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_offline_generator_returns_context() {
        let reply = OfflineTextGenerator
            .complete("prompt", "=== MENU ===\n\n", "menu")
            .await
            .unwrap();
        assert_eq!(reply, "=== MENU ===");
    }

    #[tokio::test]
    async fn test_order_book_rejects_empty_order() {
        let book = InMemoryOrderBook::new();
        let result = book
            .place_order(PlaceOrderRequest {
                table_number: None,
                items: Vec::new(),
            })
            .await;

        assert!(result.is_err());
        assert!(book.orders().is_empty());
    }
}
