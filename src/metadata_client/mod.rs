//! MetadataClient - Product Backend Adapter
//!
//! ## Responsibilities
//!
//! - Look up product metadata by the id embedded in a detected box
//! - Map 404 to NotFound and transport failures to Connection errors
//!
//! The backend is a plain REST endpoint: `GET <base>/api/product/:id`
//! returning `{id, name, category, expiration_date}` or a 404 with
//! `{error}`.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Product id as returned by the backend
///
/// The database returns numeric ids while newer records carry string
/// ids; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Num(i64),
    Str(String),
}

impl ProductId {
    /// Canonical string form used as inventory item id
    pub fn as_string(&self) -> String {
        match self {
            ProductId::Num(n) => n.to_string(),
            ProductId::Str(s) => s.clone(),
        }
    }
}

/// Product record from the metadata backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

/// Metadata backend client
pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    /// Create new metadata client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Fetch product metadata by id
    pub async fn product(&self, id: &str) -> Result<ProductRecord> {
        let url = format!("{}/api/product/{}", self.base_url, id);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Product lookup failed: {}", e)))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Product {} not found", id)));
        }

        if !resp.status().is_success() {
            return Err(Error::Connection(format!(
                "Product backend returned {}",
                resp.status()
            )));
        }

        let record: ProductRecord = resp
            .json()
            .await
            .map_err(|e| Error::Connection(format!("Product body parse failed: {}", e)))?;

        Ok(record)
    }

    /// Backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
