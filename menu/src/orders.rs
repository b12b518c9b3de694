use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Catalog;

/// Option selection on a line item, e.g. {"size": "large", "crust": "thin"}.
///
/// A `BTreeMap` keeps keys in canonical order, so two selections compare
/// equal whenever they hold the same pairs regardless of how the caller
/// assembled them.
pub type OptionSelection = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// One line of a submitted cart. Unit price is what the client saw;
/// the server replaces it with the catalog price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedItem {
    pub product_id: String,
    #[serde(default)]
    pub options: OptionSelection,
    pub quantity: u32,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub observation: Option<String>,
}

/// What checkout posts to the order endpoint. Totals here are advisory
/// only and never charged as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSubmission {
    pub customer: Customer,
    pub items: Vec<SubmittedItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub discount_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub options: OptionSelection,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    #[serde(default)]
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("order has no items")]
    Empty,

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("invalid quantity for product: {0}")]
    InvalidQuantity(String),
}

impl Order {
    /// Build an order from a checkout submission. Every line is repriced
    /// from the catalog and the totals are recomputed; the client-computed
    /// figures are discarded.
    pub fn from_submission(
        submission: OrderSubmission,
        catalog: &Catalog,
        delivery_fee_cents: i64,
    ) -> Result<Self, OrderError> {
        if submission.items.is_empty() {
            return Err(OrderError::Empty);
        }

        let mut items = Vec::with_capacity(submission.items.len());

        for submitted in submission.items {
            let product = catalog
                .get(&submitted.product_id)
                .ok_or_else(|| OrderError::UnknownProduct(submitted.product_id.clone()))?;

            if submitted.quantity == 0 {
                return Err(OrderError::InvalidQuantity(submitted.product_id));
            }

            let line_total_cents = product.price_cents * submitted.quantity as i64;

            items.push(OrderItem {
                product_id: submitted.product_id,
                name: product.name.clone(),
                options: submitted.options,
                quantity: submitted.quantity,
                unit_price_cents: product.price_cents,
                line_total_cents,
                observation: submitted.observation,
            });
        }

        let subtotal_cents: i64 = items.iter().map(|item| item.line_total_cents).sum();
        let total_cents = subtotal_cents + delivery_fee_cents - submission.discount_cents;

        Ok(Self {
            id: Uuid::new_v4(),
            customer: submission.customer,
            items,
            subtotal_cents,
            delivery_fee_cents,
            discount_cents: submission.discount_cents,
            total_cents,
            coupon_code: submission.coupon_code,
            status: OrderStatus::Received,
            created_at: Utc::now(),
        })
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            name: "Ana".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn submitted(product_id: &str, quantity: u32, unit_price_cents: i64) -> SubmittedItem {
        SubmittedItem {
            product_id: product_id.to_string(),
            options: OptionSelection::new(),
            quantity,
            unit_price_cents,
            observation: None,
        }
    }

    #[test]
    fn test_repricing_ignores_client_prices() {
        let catalog = Catalog::sample();

        // Client claims the pizza costs one cent.
        let submission = OrderSubmission {
            customer: customer(),
            items: vec![submitted("margherita", 2, 1)],
            coupon_code: None,
            discount_cents: 0,
            total_cents: 2,
        };

        let order = Order::from_submission(submission, &catalog, 500).unwrap();

        assert_eq!(order.items[0].unit_price_cents, 1250);
        assert_eq!(order.items[0].line_total_cents, 2500);
        assert_eq!(order.subtotal_cents, 2500);
        assert_eq!(order.total_cents, 3000);
        assert_eq!(order.status, OrderStatus::Received);
    }

    #[test]
    fn test_discount_carries_through() {
        let catalog = Catalog::sample();

        let submission = OrderSubmission {
            customer: customer(),
            items: vec![submitted("cola", 1, 350)],
            coupon_code: Some("welcome10".to_string()),
            discount_cents: 200,
            total_cents: 650,
        };

        let order = Order::from_submission(submission, &catalog, 500).unwrap();

        assert_eq!(order.total_cents, 350 + 500 - 200);
        assert_eq!(order.coupon_code.as_deref(), Some("welcome10"));
    }

    #[test]
    fn test_unknown_product_rejected() {
        let catalog = Catalog::sample();

        let submission = OrderSubmission {
            customer: customer(),
            items: vec![submitted("sushi", 1, 900)],
            coupon_code: None,
            discount_cents: 0,
            total_cents: 900,
        };

        assert!(matches!(
            Order::from_submission(submission, &catalog, 500),
            Err(OrderError::UnknownProduct(id)) if id == "sushi"
        ));
    }

    #[test]
    fn test_empty_submission_rejected() {
        let catalog = Catalog::sample();

        let submission = OrderSubmission {
            customer: customer(),
            items: vec![],
            coupon_code: None,
            discount_cents: 0,
            total_cents: 0,
        };

        assert!(matches!(
            Order::from_submission(submission, &catalog, 500),
            Err(OrderError::Empty)
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let catalog = Catalog::sample();

        let submission = OrderSubmission {
            customer: customer(),
            items: vec![submitted("cola", 0, 350)],
            coupon_code: None,
            discount_cents: 0,
            total_cents: 0,
        };

        assert!(matches!(
            Order::from_submission(submission, &catalog, 500),
            Err(OrderError::InvalidQuantity(_))
        ));
    }
}
