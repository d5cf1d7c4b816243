use crate::core::cart::Cart;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ProductId = i64;
pub type OrderId = i64;

/// Catalog entry. Owned by the catalog collaborator and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Product {
    pub fn new(id: ProductId, name: &str, category: &str, price: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price,
            available: true,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// One product's entry in a session cart.
///
/// `unit_price` is captured when the line is created and never follows later
/// catalog price changes.
#[derive(Debug, Clone)]
pub struct CartLine {
    product: Arc<Product>,
    quantity: u32,
    note: Option<String>,
    unit_price: f64,
}

impl CartLine {
    pub fn new(product: Arc<Product>, quantity: u32, note: Option<String>) -> Self {
        let unit_price = product.price;
        Self {
            product,
            quantity,
            note,
            unit_price,
        }
    }

    pub fn product(&self) -> &Arc<Product> {
        &self.product
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }

    /// Folds a later add of the same product into this line.
    pub(crate) fn absorb(&mut self, incoming: CartLine) {
        self.quantity = self.quantity.saturating_add(incoming.quantity);
        if let Some(note) = incoming.note.filter(|n| !n.trim().is_empty()) {
            self.note = Some(note);
        }
    }
}

impl From<ExtractedItem> for CartLine {
    fn from(item: ExtractedItem) -> Self {
        CartLine::new(item.product, item.quantity, item.note)
    }
}

/// Transient result of order extraction for one turn.
#[derive(Debug, Clone)]
pub struct ExtractedItem {
    pub product: Arc<Product>,
    pub quantity: u32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    AskMenu,
    AddToCart,
    ViewCart,
    RemoveFromCart,
    UpdateQuantity,
    ConfirmOrder,
    Cancel,
    Greeting,
    Unknown,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::AskMenu => "ASK_MENU",
            Intent::AddToCart => "ADD_TO_CART",
            Intent::ViewCart => "VIEW_CART",
            Intent::RemoveFromCart => "REMOVE_FROM_CART",
            Intent::UpdateQuantity => "UPDATE_QUANTITY",
            Intent::ConfirmOrder => "CONFIRM_ORDER",
            Intent::Cancel => "CANCEL",
            Intent::Greeting => "GREETING",
            Intent::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Per-customer conversation state held by the session store.
#[derive(Debug, Clone)]
pub struct ConversationState {
    session_id: String,
    pub(crate) cart: Cart,
    pub(crate) table_number: Option<String>,
    pub(crate) last_activity: Option<DateTime<Utc>>,
    pub(crate) metadata: HashMap<String, serde_json::Value>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            cart: Cart::default(),
            table_number: None,
            last_activity: Some(now),
            metadata: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn table_number(&self) -> Option<&str> {
        self.table_number.as_deref()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
    }
}

/// Inbound customer turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub table_number: Option<String>,
}

impl TurnRequest {
    pub fn new(message: &str, session_id: Option<&str>) -> Self {
        Self {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
            table_number: None,
        }
    }

    pub fn at_table(mut self, table_number: &str) -> Self {
        self.table_number = Some(table_number.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub note: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id(),
            name: line.product().name.clone(),
            quantity: line.quantity(),
            unit_price: line.unit_price(),
            note: line.note().map(str::to_string),
        }
    }
}

/// Outbound reply for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub session_id: String,
    pub message: String,
    pub intent: Intent,
    pub cart_lines: Vec<CartLineView>,
    pub total_amount: Option<f64>,
    pub order_id: Option<OrderId>,
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: f64,
    pub note: Option<String>,
}

impl From<&CartLine> for OrderLineRequest {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id(),
            quantity: line.quantity(),
            unit_price: line.unit_price(),
            note: line.note().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub table_number: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total_amount: f64,
}
