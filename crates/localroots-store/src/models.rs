//! Domain records persisted in the slot database.
//!
//! Field names serialize in `camelCase` and status/kind tags in lowercase,
//! the JSON layout the storefront clients expect.  Every struct
//! derives `Serialize`/`Deserialize` so it can be handed directly to a UI
//! layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use localroots_shared::types::{Community, Role};

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A listing in the marketplace catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Generator-assigned id: `max(existing ids) + 1`.
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Non-negative unit price.
    pub price: f64,
    pub category: String,
    pub community: Community,
    /// Owning seller; edits and deletion are restricted to this identity.
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    /// Average review rating, 0 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// Ordered image URLs or data URIs.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields a seller supplies when creating a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub community: Community,
    pub seller_id: String,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update to a listing; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub rating: Option<f32>,
    pub images: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// One line of a user's cart.  The unit price is snapshotted at add time so
/// later listing edits do not silently reprice the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: i64,
    /// Always positive; a quantity of zero removes the line.
    pub quantity: u32,
    pub unit_price: f64,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Fulfilment state.  Any status may be set to any other; there is no
/// transition graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// One purchased line.  Name, price, and seller are snapshots taken at order
/// time; the referenced product may later change or disappear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub seller_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub buyer_id: String,
    pub buyer_name: String,
    pub items: Vec<OrderLine>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A buyer/seller conversation, optionally anchored to one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub id: i64,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when opening a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// Append-only chat message.  Only the `read` flag ever changes after
/// creation, and only from `false` to `true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    /// Owning thread.  Not enforced as a foreign key; a message may outlive
    /// its thread only transiently, since thread deletion removes messages.
    pub thread_id: i64,
    pub sender: Role,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Deposit,
    Withdrawal,
    Purchase,
    Refund,
    Transfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
    Processing,
}

/// One entry of a user's transaction log.
///
/// The wallet has no stored balance field: the balance is always the sum of
/// the signed `amount`s, so the log and the balance cannot diverge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TxKind,
    /// Signed: credits positive, debits negative.
    pub amount: f64,
    pub description: String,
    pub date: DateTime<Utc>,
    pub status: TxStatus,
    /// Human-readable payment reference, e.g. `LR-9F3A61D2`.
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_json_keeps_the_storefront_layout() {
        let tx = WalletTransaction {
            id: Uuid::nil(),
            kind: TxKind::Deposit,
            amount: 2_500.0,
            description: "Mobile money top-up".to_string(),
            date: DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            status: TxStatus::Completed,
            reference: "LR-9F3A61D2".to_string(),
            recipient: None,
            sender: None,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["status"], "completed");
        assert!(json.get("recipient").is_none());

        let order_json = serde_json::to_value(OrderStatus::Pending).unwrap();
        assert_eq!(order_json, "pending");
    }
}
