//! Bill entity - Settlement record derived from an order or a booking.
//!
//! A bill carries its own copy of the sold lines (see `bill_item`) so later
//! catalog changes never alter it. Once `Paid` it is immutable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment status of a bill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BillStatus {
    /// Awaiting payment, discount may change
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    /// Settled (terminal)
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// How a bill was paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    /// Cash, change may be due
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Card terminal
    #[sea_orm(string_value = "card")]
    Card,
}

/// Bill database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable number printed on receipts
    #[sea_orm(unique)]
    pub bill_number: String,
    /// Order the bill was raised from
    pub order_id: Option<i64>,
    /// Booking the bill was raised from
    pub booking_id: Option<i64>,
    /// Sum of the bill's lines
    pub subtotal: f64,
    /// Discount percent, 0-100
    pub discount: f64,
    /// `subtotal * (1 - discount / 100)`
    pub total: f64,
    /// Already paid before settlement (booking advance)
    pub advance_paid: f64,
    /// Payment status
    pub status: BillStatus,
    /// Set once paid
    pub payment_method: Option<PaymentMethod>,
    /// Cash tendered, for cash payments
    pub cash_received: Option<f64>,
    /// Change handed back, for cash payments
    pub change_given: Option<f64>,
    /// Loyalty customer credited for this bill
    pub loyalty_mobile: Option<String>,
    /// Points credited for this bill
    pub points_awarded: i64,
    /// Actor that raised the bill
    pub created_by: String,
    /// Actor that settled the bill
    pub settled_by: Option<String>,
    /// When the bill was raised
    pub created_at: DateTimeUtc,
    /// When the bill was paid
    pub paid_at: Option<DateTimeUtc>,
}

/// Defines relationships between Bill and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One bill has many lines
    #[sea_orm(has_many = "super::bill_item::Entity")]
    BillItems,
}

impl Related<super::bill_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
