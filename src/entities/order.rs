//! Order entity - The live cart of items for one table or walk-in sale.
//!
//! State transitions:
//! ```text
//! Open ──► Billed ──► Paid
//! ```
//! `open_table_id` mirrors `table_id` while the order is open and is cleared
//! when it leaves `Open`. The column is unique, so a table can never have two
//! open orders even when two first-adds race.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderStatus {
    /// Items can be added or voided
    #[sea_orm(string_value = "open")]
    Open,
    /// Sent for payment, a bill exists
    #[sea_orm(string_value = "billed")]
    Billed,
    /// Bill settled (terminal)
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl OrderStatus {
    /// Returns true if items can be added or removed in this state.
    #[must_use]
    pub const fn can_modify_items(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the order can be sent for billing.
    #[must_use]
    pub const fn can_close(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the order can be marked paid.
    #[must_use]
    pub const fn can_pay(&self) -> bool {
        matches!(self, Self::Billed)
    }

    /// Returns the state name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Billed => "billed",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Table the order belongs to, None for walk-in sales
    pub table_id: Option<i64>,
    /// Equal to `table_id` while open, None otherwise
    #[sea_orm(unique)]
    pub open_table_id: Option<i64>,
    /// Lifecycle state
    pub status: OrderStatus,
    /// Sum of `unit_price * quantity` over the order's lines
    pub total_price: f64,
    /// Actor that opened the order
    pub created_by: String,
    /// When the order was opened
    pub created_at: DateTimeUtc,
    /// When the order last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order may belong to one table
    #[sea_orm(
        belongs_to = "super::dining_table::Entity",
        from = "Column::TableId",
        to = "super::dining_table::Column::Id"
    )]
    DiningTable,
    /// One order has many lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::dining_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiningTable.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_open_accepts_items() {
        assert!(OrderStatus::Open.can_modify_items());
        assert!(!OrderStatus::Billed.can_modify_items());
        assert!(!OrderStatus::Paid.can_modify_items());
    }

    #[test]
    fn test_no_state_is_skipped() {
        assert!(OrderStatus::Open.can_close());
        assert!(!OrderStatus::Open.can_pay());
        assert!(OrderStatus::Billed.can_pay());
        assert!(!OrderStatus::Billed.can_close());
        assert!(!OrderStatus::Paid.can_pay());
        assert!(!OrderStatus::Paid.can_close());
    }
}
