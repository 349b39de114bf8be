//! Menu item entity - A sellable catalog entry with price and optional stock.
//!
//! Inventoried items carry an on-hand `stock` count that commits decrement;
//! non-inventoried items (made to order, services) have no stock and never run out.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether an item's on-hand count is tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum StockType {
    /// Stock is counted and may run out
    #[sea_orm(string_value = "inventoried")]
    Inventoried,
    /// Stock is not tracked
    #[sea_orm(string_value = "non_inventoried")]
    NonInventoried,
}

/// Menu item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    /// Unique identifier for the menu item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Chicken Biryani")
    pub name: String,
    /// Current unit price
    pub price: f64,
    /// Whether stock is tracked
    pub stock_type: StockType,
    /// On-hand count, present only for inventoried items
    pub stock: Option<i64>,
    /// Whether the item can currently be sold
    pub available: bool,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Returns true when the item's stock is tracked.
    #[must_use]
    pub fn is_inventoried(&self) -> bool {
        self.stock_type == StockType::Inventoried
    }
}

/// Menu items are referenced by order lines, booking charges and bill lines
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One menu item appears on many order lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
