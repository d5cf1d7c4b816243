pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Catalog};

pub use config::{EngineConfig, SharedEngine};
pub use core::{ConversationEngine, SessionStore, TurnRules};
pub use domain::model::{Intent, TurnRequest, TurnResponse};
pub use utils::error::{OrderChatError, Result};
