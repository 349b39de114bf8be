//! Billing aggregate - Bills raised from orders and bookings.
//!
//! A bill copies its lines into `bill_items` when it is raised, so later catalog
//! changes never reach it. While `Unpaid` only the discount may change; the move
//! to `Paid` is a conditional update on the status column, so of two concurrent
//! settlements exactly one wins and the other sees `BillAlreadySettled`.

use crate::{
    core::{
        booking,
        money::{require_non_negative, round_money},
        order, sequence,
    },
    entities::{
        Bill, BillItem, BillStatus, PaymentMethod, bill, bill_item, booking as booking_entity,
        order as order_entity,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Label used for the room-charge line on booking bills.
pub const ROOM_CHARGE_LINE: &str = "Room charge";

/// `subtotal * (1 - discount / 100)`, rounded to cents.
#[must_use]
pub fn compute_total(subtotal: f64, discount: f64) -> f64 {
    round_money(subtotal * (1.0 - discount / 100.0))
}

/// What is still owed after any advance: `max(total - advance_paid, 0)`.
#[must_use]
pub fn amount_due(total: f64, advance_paid: f64) -> f64 {
    round_money((total - advance_paid).max(0.0))
}

/// Clamps a discount percent to `[0, 100]`.
///
/// # Errors
/// Returns `InvalidAmount` for NaN or infinite input.
pub fn clamp_discount(percent: f64) -> Result<f64> {
    if !percent.is_finite() {
        return Err(Error::InvalidAmount { amount: percent });
    }
    Ok(percent.clamp(0.0, 100.0))
}

/// Checks a payment against the amount due and returns the change, if any.
///
/// Cash must cover the amount due; a missing cash amount counts as nothing
/// tendered. Card payments are always accepted and never give change.
///
/// # Errors
/// Returns `InvalidAmount` for a negative or non-finite cash amount and
/// `InsufficientPayment` when cash falls short.
pub fn validate_payment(
    amount_due: f64,
    method: PaymentMethod,
    cash_received: Option<f64>,
) -> Result<Option<f64>> {
    match method {
        PaymentMethod::Card => Ok(None),
        PaymentMethod::Cash => {
            let received = round_money(require_non_negative(cash_received.unwrap_or(0.0))?);
            if received < amount_due {
                return Err(Error::InsufficientPayment {
                    required: amount_due,
                    received,
                });
            }
            Ok(Some(round_money(received - amount_due)))
        }
    }
}

/// Payment details recorded on a settled bill.
#[derive(Debug, Clone, Copy)]
pub struct Payment<'a> {
    /// Cash or card
    pub method: PaymentMethod,
    /// Cash tendered
    pub cash_received: Option<f64>,
    /// Change handed back
    pub change_given: Option<f64>,
    /// Actor settling the bill
    pub settled_by: &'a str,
}

/// A line to be copied onto a new bill.
struct BillLine {
    menu_item_id: Option<i64>,
    name: String,
    unit_price: f64,
    quantity: i32,
}

/// Finds a bill by ID.
pub async fn get_bill<C>(db: &C, bill_id: i64) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    Bill::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("bill", bill_id))
}

/// Returns the lines copied onto a bill.
pub async fn get_bill_items<C>(db: &C, bill_id: i64) -> Result<Vec<bill_item::Model>>
where
    C: ConnectionTrait,
{
    BillItem::find()
        .filter(bill_item::Column::BillId.eq(bill_id))
        .order_by_asc(bill_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists unpaid bills, oldest first.
pub async fn list_unpaid_bills<C>(db: &C) -> Result<Vec<bill::Model>>
where
    C: ConnectionTrait,
{
    Bill::find()
        .filter(bill::Column::Status.eq(BillStatus::Unpaid))
        .order_by_asc(bill::Column::CreatedAt)
        .order_by_asc(bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists bills paid within `[from, to]`, newest first.
pub async fn list_paid_bills<C>(db: &C, from: DateTimeUtc, to: DateTimeUtc) -> Result<Vec<bill::Model>>
where
    C: ConnectionTrait,
{
    Bill::find()
        .filter(bill::Column::Status.eq(BillStatus::Paid))
        .filter(bill::Column::PaidAt.gte(from))
        .filter(bill::Column::PaidAt.lte(to))
        .order_by_desc(bill::Column::PaidAt)
        .order_by_desc(bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns the unpaid bill raised for a booking, if any.
pub async fn get_unpaid_booking_bill<C>(db: &C, booking_id: i64) -> Result<Option<bill::Model>>
where
    C: ConnectionTrait,
{
    Bill::find()
        .filter(bill::Column::BookingId.eq(booking_id))
        .filter(bill::Column::Status.eq(BillStatus::Unpaid))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_bill<C>(
    db: &C,
    source: (Option<i64>, Option<i64>),
    advance_paid: f64,
    lines: Vec<BillLine>,
    prefix: &str,
    actor_id: &str,
) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    let (order_id, booking_id) = source;
    let subtotal = round_money(
        lines
            .iter()
            .map(|line| line.unit_price * f64::from(line.quantity))
            .sum(),
    );
    let bill_number = sequence::next_bill_number(db, prefix).await?;

    let created = bill::ActiveModel {
        bill_number: Set(bill_number),
        order_id: Set(order_id),
        booking_id: Set(booking_id),
        subtotal: Set(subtotal),
        discount: Set(0.0),
        total: Set(subtotal),
        advance_paid: Set(round_money(advance_paid)),
        status: Set(BillStatus::Unpaid),
        payment_method: Set(None),
        cash_received: Set(None),
        change_given: Set(None),
        loyalty_mobile: Set(None),
        points_awarded: Set(0),
        created_by: Set(actor_id.to_string()),
        settled_by: Set(None),
        created_at: Set(chrono::Utc::now()),
        paid_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for line in lines {
        bill_item::ActiveModel {
            bill_id: Set(created.id),
            menu_item_id: Set(line.menu_item_id),
            name: Set(line.name),
            unit_price: Set(line.unit_price),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    info!(
        bill_id = created.id,
        bill_number = %created.bill_number,
        subtotal,
        "Bill issued"
    );
    Ok(created)
}

/// Raises an unpaid bill from an order's lines.
///
/// The order is expected to have been closed for billing in the same transaction.
///
/// # Errors
/// Returns `EmptyOrder` if the order has no lines.
pub async fn create_bill_from_order<C>(
    db: &C,
    source: &order_entity::Model,
    prefix: &str,
    actor_id: &str,
) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    let items = order::get_order_items(db, source.id).await?;
    if items.is_empty() {
        return Err(Error::EmptyOrder {
            order_id: source.id,
        });
    }

    let lines = items
        .into_iter()
        .map(|item| BillLine {
            menu_item_id: Some(item.menu_item_id),
            name: item.name,
            unit_price: item.unit_price,
            quantity: item.quantity,
        })
        .collect();

    insert_bill(db, (Some(source.id), None), 0.0, lines, prefix, actor_id).await
}

/// Raises an unpaid bill for a booking: the room charge plus every posted charge.
/// The booking's advance is carried as `advance_paid`.
///
/// # Errors
/// Returns `BookingNotActive` unless the guest is checked in and
/// `BillAlreadyIssued` if an unpaid bill for the booking already exists.
pub async fn create_bill_from_booking<C>(
    db: &C,
    source: &booking_entity::Model,
    prefix: &str,
    actor_id: &str,
) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    if !source.status.accepts_charges() {
        return Err(Error::BookingNotActive {
            booking_id: source.id,
            status: source.status.to_string(),
        });
    }
    if let Some(existing) = get_unpaid_booking_bill(db, source.id).await? {
        return Err(Error::BillAlreadyIssued {
            booking_id: source.id,
            bill_number: existing.bill_number,
        });
    }

    let mut lines = vec![BillLine {
        menu_item_id: None,
        name: ROOM_CHARGE_LINE.to_string(),
        unit_price: source.total_price,
        quantity: 1,
    }];
    lines.extend(
        booking::get_booking_charges(db, source.id)
            .await?
            .into_iter()
            .map(|charge| BillLine {
                menu_item_id: Some(charge.menu_item_id),
                name: charge.name,
                unit_price: charge.unit_price,
                quantity: charge.quantity,
            }),
    );

    insert_bill(
        db,
        (None, Some(source.id)),
        source.advance_payment,
        lines,
        prefix,
        actor_id,
    )
    .await
}

/// Sets the discount percent on an unpaid bill and recomputes its total.
///
/// Out-of-range percents are clamped to `[0, 100]`.
///
/// # Errors
/// Returns `InvalidAmount` for a non-finite percent and `BillAlreadySettled`
/// if the bill is paid.
pub async fn apply_discount<C>(db: &C, bill_id: i64, percent: f64) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    let discount = clamp_discount(percent)?;
    let current = get_bill(db, bill_id).await?;
    if current.status == BillStatus::Paid {
        return Err(Error::BillAlreadySettled { bill_id });
    }

    let total = compute_total(current.subtotal, discount);
    let mut active: bill::ActiveModel = current.into();
    active.discount = Set(discount);
    active.total = Set(total);
    let updated = active.update(db).await?;

    debug!(bill_id, discount, total, "Discount applied");
    Ok(updated)
}

/// Moves an unpaid bill to `Paid`, stamping the final total and payment details.
///
/// # Errors
/// Returns `BillAlreadySettled` if the bill is no longer unpaid.
pub async fn mark_paid<C>(
    db: &C,
    bill_id: i64,
    total: f64,
    payment: Payment<'_>,
) -> Result<bill::Model>
where
    C: ConnectionTrait,
{
    let result = Bill::update_many()
        .set(bill::ActiveModel {
            total: Set(total),
            status: Set(BillStatus::Paid),
            payment_method: Set(Some(payment.method)),
            cash_received: Set(payment.cash_received),
            change_given: Set(payment.change_given),
            settled_by: Set(Some(payment.settled_by.to_string())),
            paid_at: Set(Some(chrono::Utc::now())),
            ..Default::default()
        })
        .filter(bill::Column::Id.eq(bill_id))
        .filter(bill::Column::Status.eq(BillStatus::Unpaid))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Either the bill does not exist or another settlement got there first
        get_bill(db, bill_id).await?;
        return Err(Error::BillAlreadySettled { bill_id });
    }

    get_bill(db, bill_id).await
}

/// Stamps the loyalty credit on a paid bill unless one is already recorded.
///
/// Returns `false` when the bill already carries a credit.
pub async fn record_loyalty_credit<C>(
    db: &C,
    bill_id: i64,
    mobile: &str,
    points: i64,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Bill::update_many()
        .set(bill::ActiveModel {
            loyalty_mobile: Set(Some(mobile.trim().to_string())),
            points_awarded: Set(points),
            ..Default::default()
        })
        .filter(bill::Column::Id.eq(bill_id))
        .filter(bill::Column::Status.eq(BillStatus::Paid))
        .filter(bill::Column::LoyaltyMobile.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{catalog, order::CartLine},
        test_utils::*,
    };

    #[test]
    fn test_compute_total() {
        assert_eq!(compute_total(1000.0, 0.0), 1000.0);
        assert_eq!(compute_total(1000.0, 10.0), 900.0);
        assert_eq!(compute_total(1000.0, 100.0), 0.0);
        assert_eq!(compute_total(333.33, 12.5), 291.66);
    }

    #[test]
    fn test_amount_due_never_negative() {
        assert_eq!(amount_due(900.0, 0.0), 900.0);
        assert_eq!(amount_due(900.0, 500.0), 400.0);
        assert_eq!(amount_due(900.0, 1200.0), 0.0);
    }

    #[test]
    fn test_clamp_discount() {
        assert_eq!(clamp_discount(-5.0).unwrap(), 0.0);
        assert_eq!(clamp_discount(150.0).unwrap(), 100.0);
        assert_eq!(clamp_discount(12.5).unwrap(), 12.5);
        assert!(matches!(
            clamp_discount(f64::NAN).unwrap_err(),
            Error::InvalidAmount { .. }
        ));
    }

    #[test]
    fn test_validate_cash_payment() {
        assert_eq!(
            validate_payment(900.0, PaymentMethod::Cash, Some(900.0)).unwrap(),
            Some(0.0)
        );
        assert_eq!(
            validate_payment(900.0, PaymentMethod::Cash, Some(1000.0)).unwrap(),
            Some(100.0)
        );

        let err = validate_payment(900.0, PaymentMethod::Cash, Some(899.0)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPayment {
                required: 900.0,
                received: 899.0
            }
        ));

        let err = validate_payment(900.0, PaymentMethod::Cash, None).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPayment { received: 0.0, .. }
        ));

        assert!(validate_payment(900.0, PaymentMethod::Cash, Some(-1.0)).is_err());
    }

    #[test]
    fn test_validate_card_payment() {
        assert_eq!(
            validate_payment(900.0, PaymentMethod::Card, None).unwrap(),
            None
        );
        assert_eq!(
            validate_payment(0.0, PaymentMethod::Card, Some(50.0)).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_create_bill_from_order_snapshots_lines() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = catalog::create_menu_item(&db, "Tea", 30.0, None).await?;
        let cake = create_stocked_item(&db, "Cake", 120.0, 10).await?;

        let open = order::get_or_create_open_order(&db, table.id, "waiter-1").await?;
        order::add_items(
            &db,
            open.id,
            &[CartLine::new(tea.id, 2), CartLine::new(cake.id, 1)],
        )
        .await?;
        let closed = order::close_for_billing(&db, open.id).await?;

        let created = create_bill_from_order(&db, &closed, "BILL", "cashier-1").await?;
        assert_eq!(created.bill_number, "BILL-000001");
        assert_eq!(created.subtotal, 180.0);
        assert_eq!(created.total, 180.0);
        assert_eq!(created.discount, 0.0);
        assert_eq!(created.status, BillStatus::Unpaid);
        assert_eq!(created.order_id, Some(open.id));

        // Later price changes do not reach the bill
        let mut active: crate::entities::menu_item::ActiveModel = tea.into();
        active.price = Set(45.0);
        active.update(&db).await?;

        let items = get_bill_items(&db, created.id).await?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Tea");
        assert_eq!(items[0].unit_price, 30.0);
        assert_eq!(items[0].quantity, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_bill_from_empty_order() -> Result<()> {
        let db = setup_test_db().await?;
        let open = order::create_walk_in_order(&db, "waiter-1").await?;

        let result = create_bill_from_order(&db, &open, "BILL", "cashier-1").await;
        assert!(matches!(result.unwrap_err(), Error::EmptyOrder { .. }));
        assert!(list_unpaid_bills(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_bill_from_booking() -> Result<()> {
        let (db, room) = setup_with_room().await?;
        let water = create_stocked_item(&db, "Water", 40.0, 10).await?;

        let mut details = test_booking(room.id);
        details.total_price = 3000.0;
        details.advance_payment = 1000.0;
        let stay = booking::create_booking(&db, details).await?;
        booking::check_in(&db, stay.id).await?;
        let stay =
            booking::add_charges(&db, stay.id, &[CartLine::new(water.id, 3)], "desk").await?;

        let created = create_bill_from_booking(&db, &stay, "BILL", "desk").await?;
        assert_eq!(created.subtotal, 3120.0);
        assert_eq!(created.advance_paid, 1000.0);
        assert_eq!(amount_due(created.total, created.advance_paid), 2120.0);

        let items = get_bill_items(&db, created.id).await?;
        assert_eq!(items[0].name, ROOM_CHARGE_LINE);
        assert_eq!(items[0].menu_item_id, None);
        assert_eq!(items[1].quantity, 3);

        let again = create_bill_from_booking(&db, &stay, "BILL", "desk").await;
        assert!(matches!(
            again.unwrap_err(),
            Error::BillAlreadyIssued { bill_number, .. } if bill_number == created.bill_number
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_bill_from_unchecked_in_booking() -> Result<()> {
        let (db, room) = setup_with_room().await?;
        let stay = booking::create_booking(&db, test_booking(room.id)).await?;

        let result = create_bill_from_booking(&db, &stay, "BILL", "desk").await;
        assert!(matches!(result.unwrap_err(), Error::BookingNotActive { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_discount_recomputes_total() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_bill_for_amount(&db, 1000.0).await?;

        let updated = apply_discount(&db, created.id, 10.0).await?;
        assert_eq!(updated.discount, 10.0);
        assert_eq!(updated.total, 900.0);

        let clamped = apply_discount(&db, created.id, 250.0).await?;
        assert_eq!(clamped.discount, 100.0);
        assert_eq!(clamped.total, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_paid_is_one_shot() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_bill_for_amount(&db, 500.0).await?;
        let payment = Payment {
            method: PaymentMethod::Cash,
            cash_received: Some(500.0),
            change_given: Some(0.0),
            settled_by: "cashier-1",
        };

        let paid = mark_paid(&db, created.id, 500.0, payment).await?;
        assert_eq!(paid.status, BillStatus::Paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(paid.settled_by.as_deref(), Some("cashier-1"));
        assert!(paid.paid_at.is_some());

        let again = mark_paid(&db, created.id, 500.0, payment).await;
        assert!(matches!(
            again.unwrap_err(),
            Error::BillAlreadySettled { .. }
        ));

        // Paid bills reject discounts
        let discount = apply_discount(&db, created.id, 10.0).await;
        assert!(matches!(
            discount.unwrap_err(),
            Error::BillAlreadySettled { .. }
        ));
        assert_eq!(get_bill(&db, created.id).await?, paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_paid_missing_bill() -> Result<()> {
        let db = setup_test_db().await?;
        let payment = Payment {
            method: PaymentMethod::Card,
            cash_received: None,
            change_given: None,
            settled_by: "cashier-1",
        };
        let result = mark_paid(&db, 42, 100.0, payment).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::EntityNotFound { kind: "bill", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_paid_bills_range_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_bill_for_amount(&db, 100.0).await?;
        let second = create_bill_for_amount(&db, 200.0).await?;
        let unpaid = create_bill_for_amount(&db, 300.0).await?;

        let start = chrono::Utc::now() - chrono::Duration::minutes(1);
        for bill in [&first, &second] {
            let payment = Payment {
                method: PaymentMethod::Card,
                cash_received: None,
                change_given: None,
                settled_by: "cashier-1",
            };
            mark_paid(&db, bill.id, bill.total, payment).await?;
        }
        let end = chrono::Utc::now() + chrono::Duration::minutes(1);

        let paid = list_paid_bills(&db, start, end).await?;
        assert_eq!(paid.len(), 2);
        assert_eq!(paid[0].id, second.id);
        assert_eq!(paid[1].id, first.id);

        let unpaid_list = list_unpaid_bills(&db).await?;
        assert_eq!(unpaid_list.len(), 1);
        assert_eq!(unpaid_list[0].id, unpaid.id);

        let earlier = list_paid_bills(&db, start - chrono::Duration::days(2), start).await?;
        assert!(earlier.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_loyalty_credit_once() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_bill_for_amount(&db, 2500.0).await?;

        // Unpaid bills cannot carry a credit
        assert!(!record_loyalty_credit(&db, created.id, "9800000001", 2).await?);

        let payment = Payment {
            method: PaymentMethod::Card,
            cash_received: None,
            change_given: None,
            settled_by: "cashier-1",
        };
        mark_paid(&db, created.id, created.total, payment).await?;

        assert!(record_loyalty_credit(&db, created.id, "9800000001", 2).await?);
        assert!(!record_loyalty_credit(&db, created.id, "9800000001", 2).await?);

        let stamped = get_bill(&db, created.id).await?;
        assert_eq!(stamped.loyalty_mobile.as_deref(), Some("9800000001"));
        assert_eq!(stamped.points_awarded, 2);
        Ok(())
    }
}
