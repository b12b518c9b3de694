//! # Menu
//!
//! Shared domain data for the ordering platform.
//!
//! Everything the storefront, the admin console, and the server have to
//! agree on lives here:
//! - the product catalog served on the menu endpoint,
//! - the order model the checkout boundary submits and the server stores,
//! - the WebSocket frames pushed over the realtime channel.
//!
//! The catalog can be loaded from a local JSON file or fetched from a
//! remote URL at startup; the server falls back to the built-in sample
//! when neither is configured.

pub mod catalog;
pub mod events;
pub mod orders;
