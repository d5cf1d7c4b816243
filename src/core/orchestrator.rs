//! Per-turn conversation engine.
//!
//! A turn resolves its session, classifies the message, dispatches to the
//! handler for that intent and always produces a [`TurnResponse`]. Collaborator
//! calls are bounded by the configured timeout; their failures are logged and
//! turned into a retry reply, leaving the session as it was.

use crate::core::classifier::{IntentClassifier, IntentKeywords};
use crate::core::extractor::{ExtractionRules, OrderExtractor};
use crate::core::matcher::ProductMatcher;
use crate::core::normalizer::normalize;
use crate::core::render;
use crate::core::session_store::{lock_session, SessionStore};
use crate::domain::model::{
    CartLine, CartLineView, ExtractedItem, Intent, OrderId, OrderLineRequest, PlaceOrderRequest,
    Product, TurnRequest, TurnResponse,
};
use crate::domain::ports::{Catalog, MenuSearch, OrderPlacement, TextGenerator};
use crate::utils::error::{CartRejection, OrderChatError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TAKEOUT_LABEL: &str = "Takeout";

/// The `[assistant]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub shop_name: String,
    pub system_prompt: String,
    pub timeout_ms: u64,
    pub takeout_label: String,
    pub search_top_k: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            shop_name: "Mộc Miên".to_string(),
            system_prompt: "Bạn là nhân viên AI thân thiện của quán Mộc Miên. Bạn giúp khách hàng đặt món, trả lời câu hỏi về menu. Luôn xưng 'em' và gọi khách là 'anh/chị'. Trả lời ngắn gọn, vui vẻ, nhiệt tình.".to_string(),
            timeout_ms: 10_000,
            takeout_label: DEFAULT_TAKEOUT_LABEL.to_string(),
            search_top_k: 5,
        }
    }
}

/// Classification and extraction rules plus assistant settings for one engine.
#[derive(Debug, Clone)]
pub struct TurnRules {
    pub assistant: AssistantSettings,
    pub classifier: IntentClassifier,
    pub extractor: OrderExtractor,
}

impl TurnRules {
    pub fn new(
        assistant: AssistantSettings,
        keywords: &IntentKeywords,
        extraction: &ExtractionRules,
        matcher: ProductMatcher,
    ) -> Result<Self> {
        Ok(Self {
            assistant,
            classifier: IntentClassifier::new(keywords),
            extractor: OrderExtractor::new(extraction, matcher)?,
        })
    }

    pub fn defaults() -> Result<Self> {
        Self::new(
            AssistantSettings::default(),
            &IntentKeywords::default(),
            &ExtractionRules::default(),
            ProductMatcher::default(),
        )
    }
}

/// What a handler decided; the engine adds session and cart data.
#[derive(Debug, Default)]
struct Reply {
    message: String,
    requires_confirmation: bool,
    order: Option<(OrderId, f64)>,
}

impl Reply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn confirmable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            requires_confirmation: true,
            order: None,
        }
    }
}

pub struct ConversationEngine<C: Catalog, O: OrderPlacement, G: TextGenerator> {
    catalog: C,
    orders: O,
    generator: G,
    menu_search: Option<Arc<dyn MenuSearch>>,
    sessions: Arc<SessionStore>,
    rules: TurnRules,
}

impl<C: Catalog, O: OrderPlacement, G: TextGenerator> ConversationEngine<C, O, G> {
    pub fn new(
        catalog: C,
        orders: O,
        generator: G,
        sessions: Arc<SessionStore>,
        rules: TurnRules,
    ) -> Self {
        Self {
            catalog,
            orders,
            generator,
            menu_search: None,
            sessions,
            rules,
        }
    }

    pub fn with_menu_search(mut self, search: Arc<dyn MenuSearch>) -> Self {
        self.menu_search = Some(search);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> TurnResponse {
        let handle = self.sessions.get_or_create(request.session_id.as_deref());
        let session_id = lock_session(&handle).session_id().to_string();
        self.sessions.touch(&session_id);

        if let Some(table) = request.table_number.as_deref().map(str::trim) {
            if !table.is_empty() {
                self.sessions.set_table(&session_id, table);
            }
        }

        let message = request.message.trim();
        let cart_has_items = !self.sessions.cart(&session_id).is_empty();
        let intent = self.rules.classifier.classify_with(message, cart_has_items);
        tracing::debug!("🎯 Session {} classified as {}", session_id, intent);

        let reply = match intent {
            Intent::Greeting => Reply::text(render::greeting(&self.rules.assistant.shop_name)),
            Intent::AskMenu => self.answer_menu_question(&session_id, message).await,
            Intent::AddToCart => self.add_to_cart(&session_id, message).await,
            Intent::ViewCart => self.view_cart(&session_id),
            Intent::RemoveFromCart => self.remove_from_cart(&session_id, message),
            Intent::UpdateQuantity => Reply::text(render::UPDATE_UNSUPPORTED),
            Intent::ConfirmOrder => self.confirm_order(&session_id).await,
            Intent::Cancel => self.cancel(&session_id),
            Intent::Unknown => self.free_form(&session_id, message).await,
        };

        let lines = self.sessions.cart(&session_id);
        let total_amount = match reply.order {
            Some((_, total)) => total,
            None => self.sessions.cart_total(&session_id),
        };

        TurnResponse {
            session_id,
            message: reply.message,
            intent,
            cart_lines: lines.iter().map(CartLineView::from).collect(),
            total_amount: Some(total_amount),
            order_id: reply.order.map(|(id, _)| id),
            requires_confirmation: reply.requires_confirmation,
        }
    }

    async fn bounded<T>(
        &self,
        collaborator: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = Duration::from_millis(self.rules.assistant.timeout_ms);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(OrderChatError::Timeout {
                collaborator: collaborator.to_string(),
                after_ms: self.rules.assistant.timeout_ms,
            }),
        }
    }

    async fn menu(&self) -> Result<Vec<Arc<Product>>> {
        self.bounded("catalog", self.catalog.list_available_products())
            .await
    }

    async fn answer_menu_question(&self, session_id: &str, message: &str) -> Reply {
        let products = match self.menu().await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!("⚠️ catalog failed for session {}: {}", session_id, e);
                return Reply::text(render::GENERIC_FAILURE);
            }
        };

        let mut context = render::menu_context(&self.rules.assistant.shop_name, &products);
        if let Some(search) = &self.menu_search {
            let top_k = self.rules.assistant.search_top_k;
            match self.bounded("menu search", search.search(message, top_k)).await {
                Ok(hits) if !hits.is_empty() => context.push_str(&render::search_hits(&hits)),
                Ok(_) => {}
                Err(e) => tracing::warn!("⚠️ menu search failed, using plain menu: {}", e),
            }
        }

        self.generate(session_id, &context, message).await
    }

    async fn free_form(&self, session_id: &str, message: &str) -> Reply {
        let products = self.menu().await.unwrap_or_else(|e| {
            tracing::warn!("⚠️ catalog failed for session {}: {}", session_id, e);
            Vec::new()
        });

        let mut context = render::menu_context(&self.rules.assistant.shop_name, &products);
        let lines = self.sessions.cart(session_id);
        context.push_str(&render::conversation_context(
            self.sessions.table(session_id).as_deref(),
            &lines,
            self.sessions.cart_total(session_id),
        ));

        self.generate(session_id, &context, message).await
    }

    async fn generate(&self, session_id: &str, context: &str, message: &str) -> Reply {
        let call = self
            .generator
            .complete(&self.rules.assistant.system_prompt, context, message);
        match self.bounded("text generator", call).await {
            Ok(text) => Reply::text(text),
            Err(e) => {
                tracing::warn!("⚠️ text generator failed for session {}: {}", session_id, e);
                Reply::text(render::GENERIC_FAILURE)
            }
        }
    }

    async fn add_to_cart(&self, session_id: &str, message: &str) -> Reply {
        let products = match self.menu().await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!("⚠️ catalog failed for session {}: {}", session_id, e);
                return Reply::text(render::GENERIC_FAILURE);
            }
        };

        let extraction = self.rules.extractor.extract_detailed(message, &products);
        if extraction.items.is_empty() {
            let suggestions = self.suggestions(&extraction.unresolved, &products);
            return Reply::text(render::clarify_add(&suggestions));
        }

        if let Err(rejection) = validate_items(&extraction.items) {
            tracing::debug!("🚫 Rejected add for session {}: {:?}", session_id, rejection);
            return Reply::text(rejection.to_string());
        }

        let lines: Vec<CartLine> = extraction.items.into_iter().map(CartLine::from).collect();
        let reply = render::added(&lines);
        self.sessions.add_to_cart(session_id, lines);
        Reply::confirmable(reply)
    }

    /// Did-you-mean candidates for the words of each span no product matched.
    fn suggestions(&self, unresolved: &[String], products: &[Arc<Product>]) -> Vec<Arc<Product>> {
        let matcher = self.rules.extractor.matcher();
        let mut found: Vec<Arc<Product>> = Vec::new();
        let words = unresolved
            .iter()
            .flat_map(|text| text.split_whitespace())
            .filter(|word| normalize(*word).chars().count() >= 2);
        for word in words {
            for product in matcher.suggest_similar(word, products) {
                if !found.iter().any(|p| p.id == product.id) {
                    found.push(product);
                }
            }
        }
        found.truncate(matcher.suggestion_limit());
        found
    }

    fn view_cart(&self, session_id: &str) -> Reply {
        let lines = self.sessions.cart(session_id);
        let text = render::view_cart(&lines, self.sessions.cart_total(session_id));
        if lines.is_empty() {
            Reply::text(text)
        } else {
            Reply::confirmable(text)
        }
    }

    fn remove_from_cart(&self, session_id: &str, message: &str) -> Reply {
        let text = normalize(message);
        let names: Vec<String> = self
            .sessions
            .cart(session_id)
            .iter()
            .map(|line| line.product().name.clone())
            .filter(|name| {
                let name = normalize(name.as_str());
                !name.is_empty() && (text.contains(&name) || name.contains(&text))
            })
            .collect();

        if names.is_empty() {
            return Reply::text(render::CLARIFY_REMOVE);
        }

        let removed = self.sessions.remove_from_cart(session_id, &names);
        tracing::debug!("🗑️ Removed {} line(s) from session {}", removed, session_id);
        Reply::text(render::REMOVED)
    }

    async fn confirm_order(&self, session_id: &str) -> Reply {
        let lines = self.sessions.cart(session_id);
        if lines.is_empty() {
            return Reply::text(render::CONFIRM_EMPTY);
        }

        let table_number = self
            .sessions
            .table(session_id)
            .unwrap_or_else(|| self.rules.assistant.takeout_label.clone());
        let request = PlaceOrderRequest {
            table_number: Some(table_number),
            items: lines.iter().map(OrderLineRequest::from).collect(),
        };

        match self.bounded("order placement", self.orders.place_order(request)).await {
            Ok(placed) => {
                self.sessions.clear(session_id);
                tracing::info!(
                    "✅ Order #{} placed for session {} ({} VNĐ)",
                    placed.order_id,
                    session_id,
                    render::format_price(placed.total_amount)
                );
                Reply {
                    message: render::order_placed(
                        &self.rules.assistant.shop_name,
                        placed.order_id,
                        placed.total_amount,
                    ),
                    requires_confirmation: false,
                    order: Some((placed.order_id, placed.total_amount)),
                }
            }
            Err(e) => {
                tracing::warn!("⚠️ order placement failed for session {}: {}", session_id, e);
                Reply::text(render::ORDER_FAILED)
            }
        }
    }

    fn cancel(&self, session_id: &str) -> Reply {
        self.sessions.clear(session_id);
        tracing::debug!("❌ Session {} cancelled", session_id);
        Reply::text(render::CANCELLED)
    }
}

/// Every item must be orderable before any of them touches the cart.
pub fn validate_items(items: &[ExtractedItem]) -> std::result::Result<(), CartRejection> {
    for item in items {
        if !item.product.available {
            return Err(CartRejection::Unavailable {
                name: item.product.name.clone(),
            });
        }
        if item.quantity == 0 {
            return Err(CartRejection::NonPositiveQuantity {
                name: item.product.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PlacedOrder, ProductId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockCatalog {
        products: Vec<Arc<Product>>,
        fail: bool,
    }

    impl MockCatalog {
        fn menu() -> Self {
            Self {
                products: vec![
                    Arc::new(Product::new(1, "Cà phê đen", "Cà phê", 25000.0)),
                    Arc::new(Product::new(2, "Cà phê sữa", "Cà phê", 29000.0)),
                    Arc::new(Product::new(3, "Bánh mì", "Đồ ăn", 20000.0)),
                ],
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                products: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Catalog for MockCatalog {
        async fn list_available_products(&self) -> Result<Vec<Arc<Product>>> {
            if self.fail {
                return Err(OrderChatError::collaborator("catalog", "down"));
            }
            Ok(self.products.clone())
        }

        async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>> {
            Ok(self.products.iter().find(|p| p.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct MockOrders {
        calls: AtomicUsize,
        fail: bool,
        last: Mutex<Option<PlaceOrderRequest>>,
    }

    #[async_trait]
    impl OrderPlacement for MockOrders {
        async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(OrderChatError::collaborator("order placement", "500"));
            }
            Ok(PlacedOrder {
                order_id: 77,
                total_amount: 99000.0,
            })
        }
    }

    struct EchoGenerator {
        delay: Option<Duration>,
        contexts: Mutex<Vec<String>>,
    }

    impl EchoGenerator {
        fn new() -> Self {
            Self {
                delay: None,
                contexts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn complete(&self, _system: &str, context: &str, user_text: &str) -> Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.contexts.lock().unwrap().push(context.to_string());
            Ok(format!("LLM: {}", user_text))
        }
    }

    struct MockSearch;

    #[async_trait]
    impl MenuSearch for MockSearch {
        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<Arc<Product>>> {
            assert_eq!(top_k, 5);
            Ok(vec![Arc::new(Product::new(3, "Bánh mì", "Đồ ăn", 20000.0))])
        }
    }

    type TestEngine = ConversationEngine<MockCatalog, Arc<MockOrders>, Arc<EchoGenerator>>;

    fn engine_with(catalog: MockCatalog, orders: Arc<MockOrders>) -> TestEngine {
        ConversationEngine::new(
            catalog,
            orders,
            Arc::new(EchoGenerator::new()),
            Arc::new(SessionStore::new()),
            TurnRules::defaults().unwrap(),
        )
    }

    fn engine() -> TestEngine {
        engine_with(MockCatalog::menu(), Arc::new(MockOrders::default()))
    }

    async fn say(engine: &TestEngine, session: &str, message: &str) -> TurnResponse {
        engine
            .handle_turn(TurnRequest::new(message, Some(session)))
            .await
    }

    #[tokio::test]
    async fn test_greeting_generates_session_id() {
        let engine = engine();
        let response = engine.handle_turn(TurnRequest::new("xin chào", None)).await;

        assert_eq!(response.intent, Intent::Greeting);
        assert!(response.session_id.starts_with("session_"));
        assert!(response.message.contains("quán Mộc Miên"));
        assert!(response.cart_lines.is_empty());
        assert_eq!(response.total_amount, Some(0.0));
    }

    #[tokio::test]
    async fn test_add_then_view_cart() {
        let engine = engine();

        let added = say(&engine, "s1", "cho tôi 2 cà phê đen").await;
        assert_eq!(added.intent, Intent::AddToCart);
        assert!(added.requires_confirmation);
        assert!(added.message.contains("• Cà phê đen x2 - 50000 VNĐ"));
        assert_eq!(added.total_amount, Some(50000.0));

        let viewed = say(&engine, "s1", "xem giỏ hàng").await;
        assert_eq!(viewed.intent, Intent::ViewCart);
        assert!(viewed.requires_confirmation);
        assert!(viewed.message.contains("Tổng cộng: 50000 VNĐ"));
        assert_eq!(viewed.cart_lines.len(), 1);
        assert_eq!(viewed.cart_lines[0].product_id, 1);
        assert_eq!(viewed.cart_lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_unresolved_item_asks_for_clarification_with_suggestions() {
        let engine = engine();

        let response = say(&engine, "s1", "cho tôi 2 cà phê trứng").await;
        assert_eq!(response.intent, Intent::AddToCart);
        assert!(response.message.starts_with(render::CLARIFY_ADD));
        assert!(response.cart_lines.is_empty());

        assert!(response
            .message
            .ends_with("Có phải anh/chị muốn: Cà phê đen, Cà phê sữa?"));

        let response = say(&engine, "s1", "cho tôi 2 pizza").await;
        assert_eq!(response.message, render::CLARIFY_ADD);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected_without_touching_cart() {
        let engine = engine();

        let response = say(&engine, "s1", "cho tôi 0 bánh mì").await;
        assert_eq!(response.message, "Số lượng phải lớn hơn 0.");
        assert!(engine.sessions().cart("s1").is_empty());
    }

    #[test]
    fn test_validate_items_rejects_unavailable_product() {
        let sold_out = Arc::new(Product::new(5, "Trà đào", "Trà", 35000.0).unavailable());
        let items = vec![ExtractedItem {
            product: sold_out,
            quantity: 1,
            note: None,
        }];

        assert_eq!(
            validate_items(&items),
            Err(CartRejection::Unavailable {
                name: "Trà đào".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_remove_named_item() {
        let engine = engine();
        say(&engine, "s1", "cho tôi 2 cà phê đen").await;
        say(&engine, "s1", "lấy 1 bánh mì").await;

        let response = say(&engine, "s1", "bớt bánh mì").await;
        assert_eq!(response.intent, Intent::RemoveFromCart);
        assert_eq!(response.message, render::REMOVED);
        assert_eq!(response.cart_lines.len(), 1);
        assert_eq!(response.cart_lines[0].name, "Cà phê đen");

        let response = say(&engine, "s1", "bớt trà sữa").await;
        assert_eq!(response.message, render::CLARIFY_REMOVE);
        assert_eq!(response.cart_lines.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_empty_cart_never_places_order() {
        let orders = Arc::new(MockOrders::default());
        let engine = engine_with(MockCatalog::menu(), orders.clone());
        engine.sessions().get_or_create(Some("s1"));

        let response = say(&engine, "s1", "xác nhận").await;
        assert_eq!(response.intent, Intent::ConfirmOrder);
        assert_eq!(response.message, render::CONFIRM_EMPTY);
        assert_eq!(orders.calls.load(Ordering::SeqCst), 0);
        assert!(engine.sessions().contains("s1"));
    }

    #[tokio::test]
    async fn test_confirm_places_order_and_clears_session() {
        let orders = Arc::new(MockOrders::default());
        let engine = engine_with(MockCatalog::menu(), orders.clone());
        say(&engine, "s1", "cho tôi 2 cà phê đen").await;

        let response = say(&engine, "s1", "xác nhận").await;
        assert_eq!(response.order_id, Some(77));
        assert_eq!(response.total_amount, Some(99000.0));
        assert!(response.cart_lines.is_empty());
        assert!(response.message.contains("Mã đơn: #77"));
        assert!(!engine.sessions().contains("s1"));

        let sent = orders.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.table_number.as_deref(), Some(DEFAULT_TAKEOUT_LABEL));
        assert_eq!(sent.items.len(), 1);
        assert_eq!(sent.items[0].unit_price, 25000.0);
    }

    #[tokio::test]
    async fn test_confirm_uses_table_number_from_request() {
        let orders = Arc::new(MockOrders::default());
        let engine = engine_with(MockCatalog::menu(), orders.clone());
        engine
            .handle_turn(TurnRequest::new("lấy 1 bánh mì", Some("s1")).at_table("B4"))
            .await;

        say(&engine, "s1", "thanh toán").await;
        let sent = orders.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.table_number.as_deref(), Some("B4"));
    }

    #[tokio::test]
    async fn test_failed_placement_keeps_cart() {
        let orders = Arc::new(MockOrders {
            fail: true,
            ..MockOrders::default()
        });
        let engine = engine_with(MockCatalog::menu(), orders);
        say(&engine, "s1", "cho tôi 2 cà phê đen").await;

        let response = say(&engine, "s1", "xác nhận").await;
        assert_eq!(response.message, render::ORDER_FAILED);
        assert!(response.order_id.is_none());
        assert_eq!(response.cart_lines.len(), 1);
        assert_eq!(engine.sessions().cart("s1").len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_drops_session() {
        let engine = engine();
        say(&engine, "s1", "cho tôi 2 cà phê đen").await;

        let response = say(&engine, "s1", "hủy").await;
        assert_eq!(response.intent, Intent::Cancel);
        assert_eq!(response.message, render::CANCELLED);
        assert!(response.cart_lines.is_empty());
        assert!(!engine.sessions().contains("s1"));
    }

    #[tokio::test]
    async fn test_update_quantity_is_a_pass_through() {
        // with the default table any digit reads as an add, so drop that rule
        let rules: Vec<_> = IntentClassifier::default()
            .rules()
            .iter()
            .filter(|r| r.intent != Intent::AddToCart)
            .cloned()
            .collect();
        let mut turn_rules = TurnRules::defaults().unwrap();
        turn_rules.classifier = IntentClassifier::from_rules(rules, true);
        let engine = ConversationEngine::new(
            MockCatalog::menu(),
            Arc::new(MockOrders::default()),
            Arc::new(EchoGenerator::new()),
            Arc::new(SessionStore::new()),
            turn_rules,
        );
        engine.sessions().get_or_create(Some("s1"));
        engine.sessions().add_to_cart(
            "s1",
            vec![CartLine::new(MockCatalog::menu().products[0].clone(), 2, None)],
        );

        let response = say(&engine, "s1", "thêm 3 ly").await;
        assert_eq!(response.intent, Intent::UpdateQuantity);
        assert_eq!(response.message, render::UPDATE_UNSUPPORTED);
        assert_eq!(response.cart_lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_unknown_goes_to_text_generator_with_context() {
        let generator = Arc::new(EchoGenerator::new());
        let engine = ConversationEngine::new(
            MockCatalog::menu(),
            Arc::new(MockOrders::default()),
            generator.clone(),
            Arc::new(SessionStore::new()),
            TurnRules::defaults().unwrap(),
        );
        engine
            .handle_turn(TurnRequest::new("lấy 1 bánh mì", Some("s1")).at_table("7"))
            .await;

        let response = say(&engine, "s1", "hôm nay trời đẹp quá").await;
        assert_eq!(response.intent, Intent::Unknown);
        assert_eq!(response.message, "LLM: hôm nay trời đẹp quá");

        let contexts = generator.contexts.lock().unwrap();
        let context = contexts.last().unwrap();
        assert!(context.contains("=== MENU QUÁN MỘC MIÊN ==="));
        assert!(context.contains("Bàn: 7"));
        assert!(context.contains("- Bánh mì x1 (20000 VNĐ)"));
    }

    #[tokio::test]
    async fn test_menu_question_includes_search_hits() {
        let generator = Arc::new(EchoGenerator::new());
        let engine = ConversationEngine::new(
            MockCatalog::menu(),
            Arc::new(MockOrders::default()),
            generator.clone(),
            Arc::new(SessionStore::new()),
            TurnRules::defaults().unwrap(),
        )
        .with_menu_search(Arc::new(MockSearch));

        let response = say(&engine, "s1", "quán có món gì").await;
        assert_eq!(response.intent, Intent::AskMenu);

        let contexts = generator.contexts.lock().unwrap();
        assert!(contexts[0].contains("Món liên quan đến câu hỏi:\n- Bánh mì: 20000 VNĐ"));
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades_to_retry_message() {
        let engine = engine_with(MockCatalog::failing(), Arc::new(MockOrders::default()));

        let response = say(&engine, "s1", "cho tôi 2 cà phê đen").await;
        assert_eq!(response.intent, Intent::AddToCart);
        assert_eq!(response.message, render::GENERIC_FAILURE);

        let response = say(&engine, "s1", "menu").await;
        assert_eq!(response.message, render::GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_slow_generator_times_out() {
        let mut rules = TurnRules::defaults().unwrap();
        rules.assistant.timeout_ms = 20;
        let engine = ConversationEngine::new(
            MockCatalog::menu(),
            Arc::new(MockOrders::default()),
            Arc::new(EchoGenerator {
                delay: Some(Duration::from_millis(500)),
                contexts: Mutex::new(Vec::new()),
            }),
            Arc::new(SessionStore::new()),
            rules,
        );

        let response = say(&engine, "s1", "hôm nay trời đẹp").await;
        assert_eq!(response.message, render::GENERIC_FAILURE);
    }
}
