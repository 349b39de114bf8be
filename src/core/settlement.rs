//! Settlement coordinator - Cross-aggregate commands, one transaction each.
//!
//! Every public command opens a transaction, runs the aggregate helpers against
//! it and commits; any error drops the transaction, which rolls everything back.
//! Conflicts with concurrent writers (unique-constraint races, a busy store) are
//! retried a bounded number of times with linear backoff before surfacing as
//! `TransactionConflict`. Validation errors are returned on the first attempt.

use crate::{
    config::settings::EngineSettings,
    core::{
        billing::{self, Payment},
        booking, catalog,
        loyalty::{self, points_for_total},
        occupancy,
        order::{self, CartLine, normalize_cart},
    },
    entities::{
        BillStatus, OccupancyStatus, PaymentMethod, bill, booking as booking_entity,
        loyalty_customer, order as order_entity,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, IsolationLevel,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Role of the user invoking a command. Authorization happens upstream; the
/// role is only recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Full back-office access
    Admin,
    /// Takes table orders
    Waiter,
    /// Front desk, handles bookings
    Receptionist,
    /// Settles bills
    Cashier,
}

impl ActorRole {
    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Waiter => "waiter",
            Self::Receptionist => "receptionist",
            Self::Cashier => "cashier",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the user invoking a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque user identifier, stored as `created_by` / `settled_by`
    pub id: String,
    /// Role at the time of the command
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor.
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

/// Input to [`SettlementCoordinator::settle_bill`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Bill to settle
    pub bill_id: i64,
    /// Cash or card
    pub method: PaymentMethod,
    /// Cash tendered; required for cash payments
    pub cash_received: Option<f64>,
    /// Mobile number of the loyalty customer to credit
    pub customer_mobile: Option<String>,
}

/// Outcome of a successful settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    /// The bill in its paid state
    pub bill: bill::Model,
    /// Change handed back for cash payments
    pub change: Option<f64>,
    /// Points credited, 0 if no customer matched
    pub points_awarded: i64,
    /// Customer credited, with the new balance
    pub customer: Option<loyalty_customer::Model>,
}

/// Runs the engine's cross-aggregate commands.
///
/// Share one coordinator between tasks behind an `Arc`.
#[derive(Debug)]
pub struct SettlementCoordinator {
    db: DatabaseConnection,
    settings: EngineSettings,
}

async fn reserve_lines<C>(db: &C, lines: &[CartLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    for line in lines {
        catalog::reserve_stock(db, line.menu_item_id, line.quantity).await?;
    }
    Ok(())
}

impl SettlementCoordinator {
    /// Creates a coordinator over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: EngineSettings) -> Self {
        Self { db, settings }
    }

    /// The underlying connection, for read-only queries.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn begin(&self) -> Result<DatabaseTransaction> {
        let txn = match self.db.get_database_backend() {
            // SQLite transactions are already serializable
            DbBackend::Sqlite => self.db.begin().await?,
            _ => {
                self.db
                    .begin_with_config(Some(IsolationLevel::Serializable), None)
                    .await?
            }
        };
        Ok(txn)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut run: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match run().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    if attempt >= attempts {
                        warn!(operation, attempts, error = %e, "Giving up after repeated conflicts");
                        return Err(Error::TransactionConflict {
                            operation,
                            attempts,
                        });
                    }
                    warn!(operation, attempt, error = %e, "Conflict, retrying");
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Adds a cart to the table's open order, creating the order if needed.
    ///
    /// Reserves stock for every line, appends the lines and marks the table
    /// occupied. Any failing line aborts the whole commit.
    ///
    /// # Errors
    /// Returns cart validation errors, `EntityNotFound` for an unknown table or
    /// item, `ItemUnavailable`, `InsufficientStock`, or `TransactionConflict`.
    pub async fn commit_order_items(
        &self,
        table_id: i64,
        lines: &[CartLine],
        actor: &Actor,
    ) -> Result<order_entity::Model> {
        let lines = normalize_cart(lines)?;
        let lines = lines.as_slice();

        let updated = self
            .with_retry("commit_order_items", move || async move {
                let txn = self.begin().await?;
                occupancy::get_table(&txn, table_id).await?;
                let open = order::get_or_create_open_order(&txn, table_id, &actor.id).await?;
                reserve_lines(&txn, lines).await?;
                let updated = order::add_items(&txn, open.id, lines).await?;
                occupancy::occupy_table(&txn, table_id).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(
            actor = %actor,
            table_id,
            order_id = updated.id,
            lines = lines.len(),
            total = updated.total_price,
            "Order items committed"
        );
        Ok(updated)
    }

    /// Commits a cart as a new order with no table.
    pub async fn commit_walk_in_sale(
        &self,
        lines: &[CartLine],
        actor: &Actor,
    ) -> Result<order_entity::Model> {
        let lines = normalize_cart(lines)?;
        let lines = lines.as_slice();

        let created = self
            .with_retry("commit_walk_in_sale", move || async move {
                let txn = self.begin().await?;
                let open = order::create_walk_in_order(&txn, &actor.id).await?;
                reserve_lines(&txn, lines).await?;
                let updated = order::add_items(&txn, open.id, lines).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(
            actor = %actor,
            order_id = created.id,
            total = created.total_price,
            "Walk-in sale committed"
        );
        Ok(created)
    }

    /// Posts a cart as charges on a checked-in booking.
    ///
    /// # Errors
    /// Returns `BookingNotActive` unless the guest is checked in, plus the stock
    /// errors of [`Self::commit_order_items`].
    pub async fn commit_booking_charges(
        &self,
        booking_id: i64,
        lines: &[CartLine],
        actor: &Actor,
    ) -> Result<booking_entity::Model> {
        let lines = normalize_cart(lines)?;
        let lines = lines.as_slice();

        let updated = self
            .with_retry("commit_booking_charges", move || async move {
                let txn = self.begin().await?;
                let updated = booking::add_charges(&txn, booking_id, lines, &actor.id).await?;
                reserve_lines(&txn, lines).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(
            actor = %actor,
            booking_id,
            extra_charges = updated.extra_charges,
            "Booking charges committed"
        );
        Ok(updated)
    }

    /// Removes units of an item from an open order and returns them to stock.
    pub async fn void_order_items(
        &self,
        order_id: i64,
        menu_item_id: i64,
        quantity: i32,
        actor: &Actor,
    ) -> Result<order_entity::Model> {
        let updated = self
            .with_retry("void_order_items", move || async move {
                let txn = self.begin().await?;
                let updated = order::void_items(&txn, order_id, menu_item_id, quantity).await?;
                catalog::release_stock(&txn, menu_item_id, quantity).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(
            actor = %actor,
            order_id,
            menu_item_id,
            quantity,
            total = updated.total_price,
            "Order items voided"
        );
        Ok(updated)
    }

    /// Closes an open order and issues its bill.
    ///
    /// # Errors
    /// Returns `OrderClosed` if the order was already billed and `EmptyOrder`
    /// if it has no lines.
    pub async fn create_bill_from_order(
        &self,
        order_id: i64,
        actor: &Actor,
    ) -> Result<bill::Model> {
        let prefix = self.settings.bill_number_prefix.as_str();

        let created = self
            .with_retry("create_bill_from_order", move || async move {
                let txn = self.begin().await?;
                let closed = order::close_for_billing(&txn, order_id).await?;
                let created =
                    billing::create_bill_from_order(&txn, &closed, prefix, &actor.id).await?;
                txn.commit().await?;
                Ok(created)
            })
            .await?;

        info!(
            actor = %actor,
            order_id,
            bill_id = created.id,
            bill_number = %created.bill_number,
            "Bill created from order"
        );
        Ok(created)
    }

    /// Issues the checkout bill for a checked-in booking.
    pub async fn create_bill_from_booking(
        &self,
        booking_id: i64,
        actor: &Actor,
    ) -> Result<bill::Model> {
        let prefix = self.settings.bill_number_prefix.as_str();

        let created = self
            .with_retry("create_bill_from_booking", move || async move {
                let txn = self.begin().await?;
                let stay = booking::get_booking(&txn, booking_id).await?;
                let created =
                    billing::create_bill_from_booking(&txn, &stay, prefix, &actor.id).await?;
                txn.commit().await?;
                Ok(created)
            })
            .await?;

        info!(
            actor = %actor,
            booking_id,
            bill_id = created.id,
            bill_number = %created.bill_number,
            "Bill created from booking"
        );
        Ok(created)
    }

    /// Sets the discount percent on an unpaid bill.
    pub async fn apply_discount(
        &self,
        bill_id: i64,
        percent: f64,
        actor: &Actor,
    ) -> Result<bill::Model> {
        let updated = self
            .with_retry("apply_discount", move || async move {
                let txn = self.begin().await?;
                let updated = billing::apply_discount(&txn, bill_id, percent).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(
            actor = %actor,
            bill_id,
            discount = updated.discount,
            total = updated.total,
            "Discount applied"
        );
        Ok(updated)
    }

    /// Settles a bill and releases whatever it was holding.
    ///
    /// In one transaction: recomputes the total, validates the payment, moves the
    /// bill to paid, moves the order to paid (freeing the table when no other open
    /// order holds it) or checks the booking out (freeing the room), and credits
    /// the loyalty customer matching `customer_mobile`.
    ///
    /// # Errors
    /// Returns `BillAlreadySettled`, `InsufficientPayment`, `InvalidAmount`,
    /// `EntityNotFound` or `TransactionConflict`; nothing changes on error.
    pub async fn settle_bill(
        &self,
        request: &SettlementRequest,
        actor: &Actor,
    ) -> Result<SettlementReceipt> {
        let receipt = self
            .with_retry("settle_bill", move || self.settle_bill_once(request, actor))
            .await?;

        info!(
            actor = %actor,
            bill_id = receipt.bill.id,
            bill_number = %receipt.bill.bill_number,
            total = receipt.bill.total,
            method = ?request.method,
            points = receipt.points_awarded,
            "Bill settled"
        );
        Ok(receipt)
    }

    async fn settle_bill_once(
        &self,
        request: &SettlementRequest,
        actor: &Actor,
    ) -> Result<SettlementReceipt> {
        let txn = self.begin().await?;

        let current = billing::get_bill(&txn, request.bill_id).await?;
        if current.status == BillStatus::Paid {
            return Err(Error::BillAlreadySettled {
                bill_id: current.id,
            });
        }

        let total = billing::compute_total(current.subtotal, current.discount);
        let due = billing::amount_due(total, current.advance_paid);
        let change = billing::validate_payment(due, request.method, request.cash_received)?;

        let payment = Payment {
            method: request.method,
            cash_received: match request.method {
                PaymentMethod::Cash => request.cash_received,
                PaymentMethod::Card => None,
            },
            change_given: change,
            settled_by: &actor.id,
        };
        let mut paid = billing::mark_paid(&txn, current.id, total, payment).await?;

        if let Some(order_id) = paid.order_id {
            let settled = order::mark_paid(&txn, order_id).await?;
            if let Some(table_id) = settled.table_id {
                if order::get_open_order(&txn, table_id).await?.is_none() {
                    occupancy::release_table(&txn, table_id).await?;
                } else {
                    debug!(table_id, "Table still has an open order, keeping it occupied");
                }
            }
        }

        if let Some(booking_id) = paid.booking_id {
            let stay = booking::mark_checked_out(&txn, booking_id).await?;
            occupancy::set_room_status(&txn, stay.room_id, OccupancyStatus::Available).await?;
        }

        let mut points_awarded = 0;
        let mut customer = None;
        if let Some(mobile) = request.customer_mobile.as_deref() {
            let points = points_for_total(total, self.settings.loyalty_points_unit);
            if loyalty::find_by_mobile(&txn, mobile).await?.is_some()
                && billing::record_loyalty_credit(&txn, paid.id, mobile, points).await?
            {
                customer = loyalty::credit(&txn, mobile, points).await?;
                points_awarded = points;
                paid = billing::get_bill(&txn, paid.id).await?;
            }
        }

        txn.commit().await?;

        Ok(SettlementReceipt {
            bill: paid,
            change,
            points_awarded,
            customer,
        })
    }

    /// Credits loyalty points for a paid bill that has not been credited yet.
    ///
    /// Returns `Ok(None)` without changes when the bill already carries a credit
    /// or no customer has this mobile number.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the bill is not paid.
    pub async fn credit_loyalty_if_eligible(
        &self,
        bill_id: i64,
        mobile: &str,
        actor: &Actor,
    ) -> Result<Option<loyalty_customer::Model>> {
        let unit = self.settings.loyalty_points_unit;

        let credited = self
            .with_retry("credit_loyalty_if_eligible", move || async move {
                let txn = self.begin().await?;
                let current = billing::get_bill(&txn, bill_id).await?;
                if current.status != BillStatus::Paid {
                    return Err(Error::InvalidTransition {
                        kind: "bill",
                        id: bill_id,
                        from: "unpaid".to_string(),
                        action: "credit loyalty for",
                    });
                }
                if current.loyalty_mobile.is_some()
                    || loyalty::find_by_mobile(&txn, mobile).await?.is_none()
                {
                    return Ok(None);
                }

                let points = points_for_total(current.total, unit);
                if !billing::record_loyalty_credit(&txn, bill_id, mobile, points).await? {
                    return Ok(None);
                }
                let customer = loyalty::credit(&txn, mobile, points).await?;
                txn.commit().await?;
                Ok(customer)
            })
            .await?;

        match &credited {
            Some(customer) => info!(
                actor = %actor,
                bill_id,
                customer_id = customer.id,
                balance = customer.total_loyalty_points,
                "Loyalty credited after payment"
            ),
            None => debug!(actor = %actor, bill_id, "No loyalty credit due"),
        }
        Ok(credited)
    }

    /// Checks a guest in: booking confirmed → checked-in, room occupied.
    pub async fn check_in(&self, booking_id: i64, actor: &Actor) -> Result<booking_entity::Model> {
        let updated = self
            .with_retry("check_in", move || async move {
                let txn = self.begin().await?;
                let updated = booking::check_in(&txn, booking_id).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(actor = %actor, booking_id, room_id = updated.room_id, "Guest checked in");
        Ok(updated)
    }

    /// Cancels a confirmed booking and frees its room.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        actor: &Actor,
    ) -> Result<booking_entity::Model> {
        let updated = self
            .with_retry("cancel_booking", move || async move {
                let txn = self.begin().await?;
                let updated = booking::cancel(&txn, booking_id).await?;
                txn.commit().await?;
                Ok(updated)
            })
            .await?;

        info!(actor = %actor, booking_id, room_id = updated.room_id, "Booking cancelled");
        Ok(updated)
    }
}
