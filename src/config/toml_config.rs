use crate::adapters::{
    CsvCatalog, HttpCatalog, HttpMenuSearch, HttpOrderPlacement, InMemoryOrderBook,
    OfflineTextGenerator, OpenAiTextGenerator,
};
use crate::core::classifier::IntentKeywords;
use crate::core::extractor::ExtractionRules;
use crate::core::matcher::{ProductMatcher, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_SUGGESTION_LIMIT};
use crate::core::orchestrator::{AssistantSettings, ConversationEngine, TurnRules};
use crate::core::session_store::{SessionStore, DEFAULT_SESSION_TTL_MINUTES};
use crate::domain::ports::{Catalog, OrderPlacement, TextGenerator};
use crate::utils::error::{OrderChatError, Result};
use crate::utils::validation::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Engine wired with runtime-selected collaborators.
pub type SharedEngine =
    ConversationEngine<Arc<dyn Catalog>, Arc<dyn OrderPlacement>, Arc<dyn TextGenerator>>;

pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub assistant: AssistantSettings,
    pub intents: IntentKeywords,
    pub extraction: ExtractionRules,
    pub matcher: MatcherConfig,
    pub session: SessionConfig,
    pub catalog: Option<CatalogConfig>,
    pub orders: Option<EndpointConfig>,
    pub llm: Option<LlmConfig>,
    pub search: Option<EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub similarity_threshold: f64,
    pub suggestion_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_minutes: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_SESSION_TTL_MINUTES as u64,
            sweep_interval_seconds: 60,
        }
    }
}

/// Where the menu comes from: a local CSV file or an HTTP endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OrderChatError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OrderChatError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| OrderChatError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn product_matcher(&self) -> ProductMatcher {
        ProductMatcher::new(
            self.matcher.similarity_threshold,
            self.matcher.suggestion_limit,
        )
    }

    pub fn turn_rules(&self) -> Result<TurnRules> {
        TurnRules::new(
            self.assistant.clone(),
            &self.intents,
            &self.extraction,
            self.product_matcher(),
        )
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session.ttl_minutes as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session.sweep_interval_seconds)
    }

    /// Catalog named by `[catalog]`: a CSV file, or an HTTP endpoint.
    pub fn load_catalog(&self) -> Result<Arc<dyn Catalog>> {
        let catalog = validate_required_field("catalog", &self.catalog)?;
        match (&catalog.path, &catalog.endpoint) {
            (Some(path), _) => Ok(Arc::new(CsvCatalog::from_path(path)?)),
            (None, Some(endpoint)) => Ok(Arc::new(HttpCatalog::new(endpoint.clone()))),
            (None, None) => Err(OrderChatError::MissingConfigError {
                field: "catalog.path".to_string(),
            }),
        }
    }

    /// Wires an engine around `catalog`. Orders go to the HTTP endpoint when
    /// `[orders]` is set and to an in-memory order book otherwise; without
    /// `[llm]` the text generator answers with the prepared context.
    pub fn build_engine(
        &self,
        catalog: Arc<dyn Catalog>,
        sessions: Arc<SessionStore>,
    ) -> Result<SharedEngine> {
        let orders: Arc<dyn OrderPlacement> = match &self.orders {
            Some(orders) => Arc::new(HttpOrderPlacement::new(
                orders.endpoint.clone(),
                orders.api_key.clone(),
            )),
            None => Arc::new(InMemoryOrderBook::new()),
        };

        let generator: Arc<dyn TextGenerator> = match &self.llm {
            Some(llm) => Arc::new(OpenAiTextGenerator::new(
                llm.endpoint.clone(),
                llm.api_key.clone(),
                llm.model.clone(),
            )),
            None => Arc::new(OfflineTextGenerator),
        };

        let mut engine =
            ConversationEngine::new(catalog, orders, generator, sessions, self.turn_rules()?);
        if let Some(search) = &self.search {
            engine = engine.with_menu_search(Arc::new(HttpMenuSearch::new(
                search.endpoint.clone(),
                search.api_key.clone(),
            )));
        }
        Ok(engine)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("assistant.shop_name", &self.assistant.shop_name)?;
        validate_non_empty_string("assistant.system_prompt", &self.assistant.system_prompt)?;
        validate_non_empty_string("assistant.takeout_label", &self.assistant.takeout_label)?;
        validate_positive_number("assistant.timeout_ms", self.assistant.timeout_ms, 1)?;
        validate_range("assistant.search_top_k", self.assistant.search_top_k, 1, 50)?;

        validate_keyword_list("intents.greeting", &self.intents.greeting)?;
        validate_keyword_list("intents.view_cart", &self.intents.view_cart)?;
        validate_keyword_list("intents.cancel", &self.intents.cancel)?;
        validate_keyword_list("intents.confirm", &self.intents.confirm)?;
        validate_keyword_list("intents.remove_from_cart", &self.intents.remove_from_cart)?;
        validate_keyword_list("intents.menu_question", &self.intents.menu_question)?;
        validate_keyword_list("intents.order_phrases", &self.intents.order_phrases)?;

        validate_keyword_list("extraction.order_phrases", &self.extraction.order_phrases)?;
        for conjunction in &self.extraction.conjunctions {
            validate_non_empty_string("extraction.conjunctions", conjunction)?;
        }

        validate_range(
            "matcher.similarity_threshold",
            self.matcher.similarity_threshold,
            0.0,
            1.0,
        )?;
        validate_positive_number(
            "matcher.suggestion_limit",
            self.matcher.suggestion_limit as u64,
            1,
        )?;

        validate_positive_number("session.ttl_minutes", self.session.ttl_minutes, 1)?;
        validate_positive_number(
            "session.sweep_interval_seconds",
            self.session.sweep_interval_seconds,
            1,
        )?;

        if let Some(catalog) = &self.catalog {
            match (&catalog.path, &catalog.endpoint) {
                (Some(_), Some(_)) => {
                    return Err(OrderChatError::ConfigValidationError {
                        field: "catalog".to_string(),
                        message: "Set either path or endpoint, not both".to_string(),
                    })
                }
                (Some(path), None) => validate_path("catalog.path", path)?,
                (None, Some(endpoint)) => validate_url("catalog.endpoint", endpoint)?,
                (None, None) => {}
            }
        }
        if let Some(orders) = &self.orders {
            validate_url("orders.endpoint", &orders.endpoint)?;
        }
        if let Some(llm) = &self.llm {
            validate_url("llm.endpoint", &llm.endpoint)?;
            validate_non_empty_string("llm.model", &llm.model)?;
        }
        if let Some(search) = &self.search {
            validate_url("search.endpoint", &search.endpoint)?;
        }

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();

        assert_eq!(config.assistant.shop_name, "Mộc Miên");
        assert_eq!(config.assistant.takeout_label, "Takeout");
        assert_eq!(config.matcher.similarity_threshold, 0.7);
        assert_eq!(config.matcher.suggestion_limit, 5);
        assert_eq!(config.session.ttl_minutes, 30);
        assert!(config.intents.whole_words);
        assert!(config.intents.greeting.contains(&"xin chào".to_string()));
        assert!(config.catalog.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections() {
        let toml_content = r#"
[assistant]
shop_name = "Hoa Sữa"
timeout_ms = 2500

[intents]
greeting = ["hello", "chào"]
whole_words = false

[matcher]
similarity_threshold = 0.8

[session]
ttl_minutes = 45

[catalog]
path = "./menu.csv"

[llm]
endpoint = "https://llm.example.com/v1/chat/completions"
api_key = "secret"
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.assistant.shop_name, "Hoa Sữa");
        assert_eq!(config.assistant.timeout_ms, 2500);
        assert_eq!(config.intents.greeting, vec!["hello", "chào"]);
        assert!(!config.intents.whole_words);
        // untouched lists keep their defaults
        assert!(config.intents.cancel.contains(&"hủy".to_string()));
        assert_eq!(config.matcher.similarity_threshold, 0.8);
        assert_eq!(config.session_ttl(), chrono::Duration::minutes(45));
        assert_eq!(config.llm.as_ref().unwrap().model, DEFAULT_LLM_MODEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ORDER_CHAT_TEST_LLM_KEY", "sk-test");

        let toml_content = r#"
[llm]
endpoint = "https://llm.example.com/v1/chat/completions"
api_key = "${ORDER_CHAT_TEST_LLM_KEY}"
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.llm.unwrap().api_key.as_deref(), Some("sk-test"));

        std::env::remove_var("ORDER_CHAT_TEST_LLM_KEY");
    }

    #[test]
    fn test_config_validation() {
        let bad_threshold = EngineConfig::from_toml_str("[matcher]\nsimilarity_threshold = 1.5\n").unwrap();
        assert!(bad_threshold.validate().is_err());

        let blank_keyword = EngineConfig::from_toml_str("[intents]\ncancel = [\"hủy\", \" \"]\n").unwrap();
        assert!(blank_keyword.validate().is_err());

        let bad_url = EngineConfig::from_toml_str("[orders]\nendpoint = \"${UNSET_ORDER_CHAT_URL}\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let both = EngineConfig::from_toml_str(
            "[catalog]\npath = \"menu.csv\"\nendpoint = \"https://example.com/menu\"\n",
        )
        .unwrap();
        assert!(both.validate().is_err());

        let zero_ttl = EngineConfig::from_toml_str("[session]\nttl_minutes = 0\n").unwrap();
        assert!(zero_ttl.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = EngineConfig::from_toml_str("[assistant\nshop_name = 1").unwrap_err();
        assert!(matches!(err, OrderChatError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file_and_catalog_loading() {
        let mut menu = NamedTempFile::new().unwrap();
        menu.write_all(b"id,name,category,price\n1,C\xc3\xa0 ph\xc3\xaa \xc4\x91en,C\xc3\xa0 ph\xc3\xaa,25000\n")
            .unwrap();

        let mut file = NamedTempFile::new().unwrap();
        let toml_content = format!("[catalog]\npath = {:?}\n", menu.path().display().to_string());
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.load_catalog().is_ok());
    }

    #[test]
    fn test_missing_catalog_section() {
        let config = EngineConfig::default();
        assert!(matches!(
            config.load_catalog().err(),
            Some(OrderChatError::MissingConfigError { .. })
        ));
    }
}
