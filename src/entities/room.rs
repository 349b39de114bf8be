//! Room entity - A hotel room; status follows its bookings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::dining_table::OccupancyStatus;

/// Room database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    /// Unique identifier for the room
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Room number as shown to guests (e.g., "204")
    #[sea_orm(unique)]
    pub number: String,
    /// Current occupancy
    pub status: OccupancyStatus,
}

/// Defines relationships between rooms and bookings
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One room has many bookings
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
