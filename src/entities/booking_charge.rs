//! Booking charge entity - An incidental sale posted to a room booking.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Booking charge database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_charges")]
pub struct Model {
    /// Unique identifier for the charge
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning booking
    pub booking_id: i64,
    /// Catalog entry sold
    pub menu_item_id: i64,
    /// Item name at sale time
    pub name: String,
    /// Unit price at sale time
    pub unit_price: f64,
    /// Units sold
    pub quantity: i32,
    /// Actor that posted the charge
    pub created_by: String,
    /// When the charge was posted
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Charge total (`unit_price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Defines relationships between BookingCharge and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each charge belongs to one booking
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
