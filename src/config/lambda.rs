use crate::adapters::csv_catalog::parse_catalog_csv;
use crate::adapters::memory::InMemoryCatalog;
use crate::config::toml_config::EngineConfig;
use crate::domain::model::{Product, ProductId};
use crate::domain::ports::Catalog;
use crate::utils::error::{OrderChatError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use std::env;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub catalog_bucket: String,
    pub catalog_key: String,
    pub s3_region: String,
    pub config_path: Option<String>,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            catalog_bucket: env::var("CATALOG_BUCKET").map_err(|_| OrderChatError::ConfigError {
                message: "CATALOG_BUCKET environment variable is required".to_string(),
            })?,
            catalog_key: env::var("CATALOG_KEY").unwrap_or_else(|_| "catalog.csv".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "ap-southeast-2".to_string()),
            config_path: env::var("ORDER_CHAT_CONFIG").ok(),
        })
    }

    /// Engine configuration bundled with the function, or defaults.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let config = match &self.config_path {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("catalog_bucket", &self.catalog_bucket)?;
        validate_non_empty_string("catalog_key", &self.catalog_key)?;
        validate_aws_region("s3_region", &self.s3_region)?;
        if let Some(path) = &self.config_path {
            validate_path("config_path", path)?;
        }

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let invalid = |reason: &str| OrderChatError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: bucket_name.to_string(),
        reason: reason.to_string(),
    };

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid("S3 bucket name must be between 3 and 63 characters"));
    }
    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }
    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid("S3 bucket name cannot start or end with a hyphen"));
    }
    Ok(())
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(OrderChatError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }
    Ok(())
}

/// Menu CSV read once from an S3 object.
#[derive(Debug, Clone)]
pub struct S3Catalog {
    inner: InMemoryCatalog,
}

impl S3Catalog {
    pub async fn load(client: &S3Client, bucket: &str, key: &str) -> Result<Self> {
        let resp = client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| OrderChatError::collaborator("catalog", format!("Failed to read s3://{}/{}: {}", bucket, key, e)))?;

        let data = resp.body.collect().await.map_err(|e| {
            OrderChatError::collaborator("catalog", format!("Failed to collect S3 data: {}", e))
        })?;

        let products = parse_catalog_csv(&data.into_bytes())?;
        tracing::info!("📂 Loaded {} products from s3://{}/{}", products.len(), bucket, key);
        Ok(Self {
            inner: InMemoryCatalog::new(products),
        })
    }
}

#[async_trait]
impl Catalog for S3Catalog {
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

    fn config(bucket: &str, region: &str) -> LambdaConfig {
        LambdaConfig {
            catalog_bucket: bucket.to_string(),
            catalog_key: "catalog.csv".to_string(),
            s3_region: region.to_string(),
            config_path: None,
        }
    }

    #[test]
    fn test_validation() {
        assert!(config("moc-mien-menu", "ap-southeast-1").validate().is_ok());
        assert!(config("Moc_Mien", "ap-southeast-1").validate().is_err());
        assert!(config("-menu", "ap-southeast-1").validate().is_err());
        assert!(config("menu", "AP SOUTH").validate().is_err());
    }

    #[test]
    fn test_default_engine_config() {
        let engine_config = config("menu", "us-east-1").engine_config().unwrap();
        assert_eq!(engine_config.assistant.takeout_label, "Takeout");
    }
}
