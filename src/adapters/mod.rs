// Concrete collaborators behind the domain ports.

pub mod csv_catalog;
pub mod http;
pub mod memory;

pub use csv_catalog::CsvCatalog;
pub use http::{HttpCatalog, HttpMenuSearch, HttpOrderPlacement, OpenAiTextGenerator};
pub use memory::{InMemoryCatalog, InMemoryOrderBook, OfflineTextGenerator};
