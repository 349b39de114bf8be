//! Core business logic - storage-backed aggregates and the settlement coordinator.
//!
//! Aggregate functions are generic over [`sea_orm::ConnectionTrait`] so they run
//! unchanged against a pooled connection or inside a coordinator transaction.

pub mod billing;
pub mod booking;
pub mod catalog;
pub mod loyalty;
pub mod money;
pub mod occupancy;
pub mod order;
pub mod sequence;
pub mod settlement;

pub use settlement::{
    Actor, ActorRole, SettlementCoordinator, SettlementReceipt, SettlementRequest,
};
