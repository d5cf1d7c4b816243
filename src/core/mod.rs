pub mod cart;
pub mod classifier;
pub mod extractor;
pub mod matcher;
pub mod normalizer;
pub mod orchestrator;
pub mod render;
pub mod session_store;

pub use crate::utils::error::Result;
pub use cart::Cart;
pub use classifier::{IntentClassifier, IntentKeywords};
pub use extractor::{ExtractionRules, OrderExtractor};
pub use matcher::ProductMatcher;
pub use orchestrator::{AssistantSettings, ConversationEngine, TurnRules};
pub use session_store::SessionStore;
