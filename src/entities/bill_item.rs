//! Bill item entity - Point-in-time copy of a sold line.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_items")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning bill
    pub bill_id: i64,
    /// Catalog entry, None for the room charge of a booking bill
    pub menu_item_id: Option<i64>,
    /// Line description
    pub name: String,
    /// Unit price
    pub unit_price: f64,
    /// Units
    pub quantity: i32,
}

/// Defines relationships between BillItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one bill
    #[sea_orm(
        belongs_to = "super::bill::Entity",
        from = "Column::BillId",
        to = "super::bill::Column::Id"
    )]
    Bill,
}

impl Related<super::bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bill.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
