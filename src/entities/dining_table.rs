//! Dining table entity - A restaurant table whose occupancy follows its orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Occupancy status shared by tables and rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OccupancyStatus {
    /// Free to seat / book
    #[sea_orm(string_value = "available")]
    Available,
    /// In use
    #[sea_orm(string_value = "occupied")]
    Occupied,
    /// Held for an upcoming guest
    #[sea_orm(string_value = "reserved")]
    Reserved,
}

impl OccupancyStatus {
    /// Returns the status name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    /// Unique identifier for the table
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Number printed on the table
    #[sea_orm(unique)]
    pub number: i32,
    /// Current occupancy
    pub status: OccupancyStatus,
}

/// Defines relationships between tables and orders
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One table has many orders over its lifetime
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
