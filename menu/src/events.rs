use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::orders::{Order, OrderStatus};

/// Close code for an intentional shutdown of either side. Anything else on
/// a close triggers the client's automatic reconnection.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code a client reports when the transport drops without a close
/// frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Frames the server writes onto the realtime channel. One variant per
/// message kind; the `type` field on the wire carries the tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Connection {
        message: String,
        timestamp: DateTime<Utc>,
    },
    Echo {
        data: Value,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
    OrderCreated {
        order: Order,
        timestamp: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
    },
}

impl ServerFrame {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn echo(data: Value) -> Self {
        Self::Echo {
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn order_created(order: Order) -> Self {
        Self::OrderCreated {
            order,
            timestamp: Utc::now(),
        }
    }

    pub fn order_status_changed(order_id: Uuid, status: OrderStatus) -> Self {
        Self::OrderStatusChanged {
            order_id,
            status,
            timestamp: Utc::now(),
        }
    }
}
