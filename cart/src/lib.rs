//! # Cart
//!
//! Client-side cart state. Ephemeral by design: the server is the source
//! of truth for a committed order, the cart is scratch state that feeds
//! the checkout submission.
//!
//! Lines are keyed by (product id, option selection). Option selections
//! are `BTreeMap`s, so two selections with the same pairs always land on
//! the same line no matter the order the caller built them in.
//!
//! Every mutation recomputes the subtotal, total, and item count from
//! scratch over all lines.

use menu::catalog::Product;
use menu::orders::{Customer, OptionSelection, OrderSubmission, SubmittedItem};
use serde::Serialize;

pub const DEFAULT_DELIVERY_FEE_CENTS: i64 = 500;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartItem {
    product_id: String,
    name: String,
    options: OptionSelection,
    quantity: u32,
    unit_price_cents: i64,
    line_total_cents: i64,
    observation: Option<String>,
}

impl CartItem {
    fn matches(&self, product_id: &str, options: &OptionSelection) -> bool {
        self.product_id == product_id && self.options == *options
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn options(&self) -> &OptionSelection {
        &self.options
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn line_total_cents(&self) -> i64 {
        self.line_total_cents
    }

    pub fn observation(&self) -> Option<&str> {
        self.observation.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
    delivery_fee_cents: i64,
    discount_cents: i64,
    coupon_code: Option<String>,
    subtotal_cents: i64,
    total_cents: i64,
    item_count: u32,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_FEE_CENTS)
    }
}

impl Cart {
    pub fn new(delivery_fee_cents: i64) -> Self {
        let mut cart = Self {
            items: Vec::new(),
            delivery_fee_cents,
            discount_cents: 0,
            coupon_code: None,
            subtotal_cents: 0,
            total_cents: 0,
            item_count: 0,
        };
        cart.recompute();

        cart
    }

    /// Add one unit of `product`. An existing line with the same product
    /// and option selection is incremented; otherwise a new line is
    /// appended. The merged line keeps its original observation.
    pub fn add_item(
        &mut self,
        product: &Product,
        options: OptionSelection,
        observation: Option<String>,
    ) {
        match self
            .items
            .iter_mut()
            .find(|item| item.matches(&product.id, &options))
        {
            Some(item) => {
                item.quantity += 1;
                item.line_total_cents = item.unit_price_cents * item.quantity as i64;
            }
            None => self.items.push(CartItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                options,
                quantity: 1,
                unit_price_cents: product.price_cents,
                line_total_cents: product.price_cents,
                observation,
            }),
        }

        self.recompute();
    }

    /// Add `delta` to the quantity of the matching line. No-op when no
    /// line matches. A resulting quantity of zero or less deletes the
    /// line.
    pub fn update_quantity(&mut self, product_id: &str, delta: i32, options: &OptionSelection) {
        let Some(position) = self
            .items
            .iter()
            .position(|item| item.matches(product_id, options))
        else {
            return;
        };

        let quantity = self.items[position].quantity as i64 + delta as i64;

        if quantity <= 0 {
            self.items.remove(position);
        } else {
            let item = &mut self.items[position];
            item.quantity = quantity as u32;
            item.line_total_cents = item.unit_price_cents * quantity;
        }

        self.recompute();
    }

    /// Delete the matching line. No-op when no line matches.
    pub fn remove_item(&mut self, product_id: &str, options: &OptionSelection) {
        self.items
            .retain(|item| !item.matches(product_id, options));

        self.recompute();
    }

    /// Record a discount. Eligibility is the coupon endpoint's problem;
    /// the cart applies whatever it is told.
    pub fn apply_discount(&mut self, discount_cents: i64, coupon_code: Option<String>) {
        self.discount_cents = discount_cents;
        self.coupon_code = coupon_code;

        self.recompute();
    }

    /// Back to the empty default, e.g. after order submission.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn recompute(&mut self) {
        self.subtotal_cents = self.items.iter().map(|item| item.line_total_cents).sum();
        self.item_count = self.items.iter().map(|item| item.quantity).sum();
        self.total_cents = self.subtotal_cents + self.delivery_fee_cents - self.discount_cents;
    }

    /// The read-only contract checkout posts to the order endpoint. The
    /// totals inside are advisory; the server reprices.
    pub fn submission(&self, customer: Customer) -> OrderSubmission {
        OrderSubmission {
            customer,
            items: self
                .items
                .iter()
                .map(|item| SubmittedItem {
                    product_id: item.product_id.clone(),
                    options: item.options.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                    observation: item.observation.clone(),
                })
                .collect(),
            coupon_code: self.coupon_code.clone(),
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.subtotal_cents
    }

    pub fn delivery_fee_cents(&self) -> i64 {
        self.delivery_fee_cents
    }

    pub fn discount_cents(&self) -> i64 {
        self.discount_cents
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }
}
