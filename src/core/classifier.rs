//! Maps a customer message to one [`Intent`].
//!
//! Classification walks an ordered rule table and returns the intent of the
//! first rule that fires. The order is part of the contract: keyword sets
//! overlap (`xóa` is both a cancel and a remove word), so a cancel keyword
//! always wins over a remove keyword, and removal is only considered when the
//! cart has something to remove.
//!
//! Keywords written with Vietnamese accents are matched against the lowercased
//! message with its accents kept, so `bỏ` never matches `bơ` and `chào` never
//! matches `cháo`. Accent-free keywords are matched against the folded message.

use crate::core::cart::Cart;
use crate::core::normalizer::{contains_phrase, normalize};
use crate::domain::model::Intent;
use serde::{Deserialize, Serialize};

/// Keyword vocabularies, one list per rule. Loaded from the `[intents]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentKeywords {
    pub greeting: Vec<String>,
    pub view_cart: Vec<String>,
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub remove_from_cart: Vec<String>,
    pub menu_question: Vec<String>,
    pub order_phrases: Vec<String>,
    /// Match keywords only on token boundaries of the message.
    /// `false` gives plain substring containment.
    pub whole_words: bool,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for IntentKeywords {
    fn default() -> Self {
        Self {
            greeting: words(&["xin chào", "chào", "hello", "hi", "chào bạn", "chào em"]),
            view_cart: words(&[
                "giỏ hàng",
                "cart",
                "đơn hàng",
                "xem giỏ",
                "giỏ của tôi",
                "tôi đã chọn gì",
            ]),
            cancel: words(&["hủy", "cancel", "xóa", "bỏ", "không cần", "thôi"]),
            confirm: words(&[
                "xác nhận",
                "đặt hàng",
                "order",
                "ok",
                "đồng ý",
                "thanh toán",
                "checkout",
                "tôi muốn đặt",
            ]),
            remove_from_cart: words(&["xóa", "bỏ", "remove", "không cần", "bớt"]),
            menu_question: words(&["menu", "món", "có gì", "bán gì", "giá", "bao nhiêu", "thế nào"]),
            order_phrases: words(&["cho tôi", "tôi muốn", "lấy", "mua", "đặt"]),
            whole_words: true,
        }
    }
}

/// Condition half of a classification rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RulePredicate {
    BlankMessage,
    AnyKeyword(Vec<Keyword>),
    /// Keyword present and the cart holds at least one line.
    AnyKeywordWithItems(Vec<Keyword>),
    /// Message contains a digit or one of the phrases.
    DigitOrPhrase(Vec<Keyword>),
    /// Message contains a digit and the cart holds at least one line.
    DigitWithItems,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentRule {
    pub predicate: RulePredicate,
    pub intent: Intent,
}

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
    whole_words: bool,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(&IntentKeywords::default())
    }
}

/// A lowercased keyword that remembers whether it carries accents.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    text: String,
    accented: bool,
}

impl Keyword {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let accented = normalize(text.as_str()) != text;
        Self { text, accented }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_accented(&self) -> bool {
        self.accented
    }
}

fn keyword_list(list: &[String]) -> Vec<Keyword> {
    list.iter()
        .map(|k| Keyword::new(k))
        .filter(|k| !k.text.is_empty())
        .collect()
}

/// The two views of a message that keywords are compared against.
struct MessageText {
    lowered: String,
    folded: String,
}

impl MessageText {
    fn new(message: &str) -> Self {
        Self {
            lowered: message.trim().to_lowercase(),
            folded: normalize(message),
        }
    }

    fn view_for(&self, keyword: &Keyword) -> &str {
        if keyword.accented {
            &self.lowered
        } else {
            &self.folded
        }
    }
}

impl IntentClassifier {
    pub fn new(keywords: &IntentKeywords) -> Self {
        use RulePredicate::*;

        let rules = vec![
            IntentRule {
                predicate: BlankMessage,
                intent: Intent::Unknown,
            },
            IntentRule {
                predicate: AnyKeyword(keyword_list(&keywords.greeting)),
                intent: Intent::Greeting,
            },
            IntentRule {
                predicate: AnyKeyword(keyword_list(&keywords.view_cart)),
                intent: Intent::ViewCart,
            },
            IntentRule {
                predicate: AnyKeyword(keyword_list(&keywords.cancel)),
                intent: Intent::Cancel,
            },
            IntentRule {
                predicate: AnyKeyword(keyword_list(&keywords.confirm)),
                intent: Intent::ConfirmOrder,
            },
            IntentRule {
                predicate: AnyKeywordWithItems(keyword_list(&keywords.remove_from_cart)),
                intent: Intent::RemoveFromCart,
            },
            IntentRule {
                predicate: AnyKeyword(keyword_list(&keywords.menu_question)),
                intent: Intent::AskMenu,
            },
            IntentRule {
                predicate: DigitOrPhrase(keyword_list(&keywords.order_phrases)),
                intent: Intent::AddToCart,
            },
            IntentRule {
                predicate: DigitWithItems,
                intent: Intent::UpdateQuantity,
            },
        ];

        Self {
            rules,
            whole_words: keywords.whole_words,
        }
    }

    /// Classifier over a caller-supplied rule table, evaluated in the given order.
    pub fn from_rules(rules: Vec<IntentRule>, whole_words: bool) -> Self {
        Self { rules, whole_words }
    }

    /// The rule table in evaluation order.
    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn classify(&self, message: &str, cart: &Cart) -> Intent {
        self.classify_with(message, !cart.is_empty())
    }

    pub fn classify_with(&self, message: &str, cart_has_items: bool) -> Intent {
        let text = MessageText::new(message);
        self.rules
            .iter()
            .find(|rule| self.fires(&rule.predicate, &text, cart_has_items))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }

    fn fires(&self, predicate: &RulePredicate, text: &MessageText, cart_has_items: bool) -> bool {
        match predicate {
            RulePredicate::BlankMessage => text.folded.is_empty(),
            RulePredicate::AnyKeyword(keywords) => self.any_keyword(text, keywords),
            RulePredicate::AnyKeywordWithItems(keywords) => {
                cart_has_items && self.any_keyword(text, keywords)
            }
            RulePredicate::DigitOrPhrase(phrases) => {
                has_digit(&text.folded) || self.any_keyword(text, phrases)
            }
            RulePredicate::DigitWithItems => cart_has_items && has_digit(&text.folded),
        }
    }

    fn any_keyword(&self, text: &MessageText, keywords: &[Keyword]) -> bool {
        keywords.iter().any(|k| {
            let haystack = text.view_for(k);
            if self.whole_words {
                contains_phrase(haystack, k.as_str())
            } else {
                haystack.contains(k.as_str())
            }
        })
    }
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}
