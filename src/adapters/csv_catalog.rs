//! Catalog read from CSV with the header `id,name,category,price,available`.
//!
//! The `available` column is optional and defaults to `true`.

use crate::adapters::memory::InMemoryCatalog;
use crate::domain::model::{Product, ProductId};
use crate::domain::ports::Catalog;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub fn parse_catalog_csv(data: &[u8]) -> Result<Vec<Product>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut products = Vec::new();
    for record in reader.deserialize::<Product>() {
        products.push(record?);
    }
    Ok(products)
}

#[derive(Debug, Clone)]
pub struct CsvCatalog {
    inner: InMemoryCatalog,
}

impl CsvCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(&path)?;
        let catalog = Self::from_bytes(&data)?;
        tracing::info!(
            "📂 Loaded {} products from {}",
            catalog.inner.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: InMemoryCatalog::new(parse_catalog_csv(data)?),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl Catalog for CsvCatalog {
    async fn list_available_products(&self) -> Result<Vec<Arc<Product>>> {
        self.inner.list_available_products().await
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Arc<Product>>> {
        self.inner.find_product(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::OrderChatError;

    #[test]
    fn test_parse_with_optional_available_column() {
        let csv = "id,name,category,price,available\n\
                   1, Cà phê đen ,Cà phê,25000,true\n\
                   2,Trà đào,Trà,35000,false\n";
        let products = parse_catalog_csv(csv.as_bytes()).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Cà phê đen");
        assert_eq!(products[0].price, 25000.0);
        assert!(!products[1].available);

        let without_flag = "id,name,category,price\n3,Bánh mì,Đồ ăn,20000\n";
        let products = parse_catalog_csv(without_flag.as_bytes()).unwrap();
        assert!(products[0].available);
    }

    #[test]
    fn test_malformed_price_is_a_csv_error() {
        let csv = "id,name,category,price\n1,Cà phê đen,Cà phê,free\n";
        let err = parse_catalog_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, OrderChatError::CsvError(_)));
    }

    #[tokio::test]
    async fn test_catalog_hides_unavailable_products() {
        let csv = "id,name,category,price,available\n1,Cà phê đen,Cà phê,25000,true\n2,Trà đào,Trà,35000,false\n";
        let catalog = CsvCatalog::from_bytes(csv.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.list_available_products().await.unwrap().len(), 1);
    }
}
