//! # Catalog
//!
//! In-memory product catalog.
//!
//! Core purpose is menu browsing and server-side repricing: the catalog is
//! the pricing authority, so whatever unit prices a client submits at
//! checkout are replaced by the prices stored here.
//!
//! ## Requirements
//!
//! - Fast lookups by product id
//! - Small dataset, loaded once at startup
//! - Prices are integer cents, never floats
//!
//! ## Sources
//!
//! - JSON file on disk (`MENU_PATH`)
//! - Remote JSON fetched over HTTP (`MENU_URL`)
//! - Built-in sample used as the default and in tests
use std::{collections::HashMap, fs};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<String, Product>,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read menu file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed menu data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to fetch remote menu: {0}")]
    Fetch(#[from] reqwest::Error),
}

impl Catalog {
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut map = HashMap::with_capacity(products.len());

        for mut product in products {
            product.id = sanitize(&product.id);
            product.name = product.name.trim().to_string();
            product.category = sanitize(&product.category);

            if product.id.is_empty() || product.name.is_empty() {
                warn!("Skipping catalog entry with empty id or name");
                continue;
            }

            map.insert(product.id.clone(), product);
        }

        Self { products: map }
    }

    pub fn from_json(data: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(data)?;

        Ok(Self::from_products(products))
    }

    pub fn load_file(path: &str) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path)?;

        Self::from_json(&data)
    }

    pub async fn load_remote(url: &str) -> Result<Self, CatalogError> {
        let response = reqwest::get(url).await?;
        let data = response.text().await?;

        Self::from_json(&data)
    }

    pub fn sample() -> Self {
        Self::from_products(vec![
            Product {
                id: "margherita".to_string(),
                name: "Margherita Pizza".to_string(),
                price_cents: 1250,
                category: "pizza".to_string(),
            },
            Product {
                id: "diavola".to_string(),
                name: "Diavola Pizza".to_string(),
                price_cents: 1450,
                category: "pizza".to_string(),
            },
            Product {
                id: "tiramisu".to_string(),
                name: "Tiramisu".to_string(),
                price_cents: 650,
                category: "dessert".to_string(),
            },
            Product {
                id: "cola".to_string(),
                name: "Cola".to_string(),
                price_cents: 350,
                category: "drink".to_string(),
            },
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    /// Products in a stable order for responses.
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.values().cloned().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));

        products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

pub fn sanitize(input: &str) -> String {
    let replace = Regex::new(r"[_]").unwrap();
    let mut s = replace.replace_all(input, " ").into_owned();

    let clean_re = Regex::new(r"[^A-Za-z0-9- ]").unwrap();
    s = clean_re.replace_all(&s, "").into_owned();

    s = s.trim().to_string();

    let collapse = Regex::new(r" +").unwrap();
    collapse.replace_all(&s, " ").into_owned().to_lowercase()
}
