//! Booking entity - A room stay whose incidental sales accumulate as extra charges.
//!
//! State transitions:
//! ```text
//! Confirmed ──► CheckedIn ──► CheckedOut
//!     │
//!     └──► Cancelled
//! ```

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a room booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BookingStatus {
    /// Reserved, guest not yet arrived
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Guest in house, charges may accumulate
    #[sea_orm(string_value = "checked_in")]
    CheckedIn,
    /// Stay settled (terminal)
    #[sea_orm(string_value = "checked_out")]
    CheckedOut,
    /// Booking abandoned before arrival (terminal)
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    /// Returns true if incidental charges can be posted.
    #[must_use]
    pub const fn accepts_charges(&self) -> bool {
        matches!(self, Self::CheckedIn)
    }

    /// Returns true if the guest can check in.
    #[must_use]
    pub const fn can_check_in(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Returns true if the booking can be cancelled.
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Returns the state name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Room being stayed in
    pub room_id: i64,
    /// Guest name as registered
    pub guest_name: String,
    /// Guest mobile, used for loyalty lookup at checkout
    pub guest_mobile: Option<String>,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Room charge for the stay
    pub total_price: f64,
    /// Accumulated incidental sales
    pub extra_charges: f64,
    /// Amount paid up front, deducted at checkout
    pub advance_payment: f64,
    /// When the booking was made
    pub created_at: DateTimeUtc,
    /// When the booking last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking is for one room
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
    /// One booking has many incidental charges
    #[sea_orm(has_many = "super::booking_charge::Entity")]
    Charges,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl Related<super::booking_charge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
