//! Loyalty customer entity - Point balance keyed by mobile number.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loyalty customer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mobile number, the lookup key
    #[sea_orm(unique)]
    pub mobile: String,
    /// Customer name
    pub name: String,
    /// Current balance
    pub total_loyalty_points: i64,
}

/// Loyalty customers have no relationships tracked by the engine
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
