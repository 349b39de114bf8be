//! Order aggregate - The live cart for a table or walk-in sale.
//!
//! An order accepts items only while `Open`. Lines snapshot the catalog name and
//! price at add-time; adding more of an item merges into its existing line as long
//! as the price has not changed since, otherwise a new line is started so earlier
//! units keep the price they were sold at. `total_price` is recomputed from the
//! lines after every change.

use crate::{
    core::{
        catalog,
        money::{require_positive_quantity, sum_lines},
    },
    entities::{Order, OrderItem, OrderStatus, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One line of a cart as submitted by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog entry to sell
    pub menu_item_id: i64,
    /// Units to sell
    pub quantity: i32,
}

impl CartLine {
    /// Creates a cart line.
    #[must_use]
    pub const fn new(menu_item_id: i64, quantity: i32) -> Self {
        Self {
            menu_item_id,
            quantity,
        }
    }
}

/// Validates a cart and folds repeated menu items into one line each,
/// keeping first-seen order.
///
/// # Errors
/// Returns `EmptyCart` for an empty cart and `InvalidQuantity` for a
/// non-positive or overflowing quantity.
pub fn normalize_cart(lines: &[CartLine]) -> Result<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        require_positive_quantity(line.quantity)?;
        match merged
            .iter_mut()
            .find(|existing| existing.menu_item_id == line.menu_item_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    Error::InvalidQuantity {
                        quantity: line.quantity,
                    },
                )?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// Finds an order by ID.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))
}

/// Returns the open order for a table, if any.
pub async fn get_open_order<C>(db: &C, table_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::OpenTableId.eq(table_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns an order's lines in the order they were added.
pub async fn get_order_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn insert_order<C>(db: &C, table_id: Option<i64>, actor_id: &str) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    order::ActiveModel {
        table_id: Set(table_id),
        open_table_id: Set(table_id),
        status: Set(OrderStatus::Open),
        total_price: Set(0.0),
        created_by: Set(actor_id.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the table's open order, creating an empty one if none exists.
///
/// Two concurrent creators collide on the unique `open_table_id` column; the
/// loser's transaction fails with a retryable error and finds the winner's order
/// on its next attempt.
pub async fn get_or_create_open_order<C>(
    db: &C,
    table_id: i64,
    actor_id: &str,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_open_order(db, table_id).await? {
        return Ok(existing);
    }

    let created = insert_order(db, Some(table_id), actor_id).await?;
    debug!(order_id = created.id, table_id, "Opened order for table");
    Ok(created)
}

/// Creates an empty open order with no table (walk-in sale).
pub async fn create_walk_in_order<C>(db: &C, actor_id: &str) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let created = insert_order(db, None, actor_id).await?;
    debug!(order_id = created.id, "Opened walk-in order");
    Ok(created)
}

fn ensure_open(order: &order::Model) -> Result<()> {
    if order.status.can_modify_items() {
        Ok(())
    } else {
        Err(Error::OrderClosed {
            order_id: order.id,
            status: order.status.to_string(),
        })
    }
}

async fn refresh_total<C>(db: &C, order: order::Model) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let items = get_order_items(db, order.id).await?;
    let total = sum_lines(items.iter().map(|item| (item.unit_price, item.quantity)));

    let mut active: order::ActiveModel = order.into();
    active.total_price = Set(total);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Appends cart lines to an open order at current catalog prices.
///
/// Stock is not touched here; the settlement coordinator reserves it in the same
/// transaction.
///
/// # Errors
/// Returns `OrderClosed` if the order is billed or paid, plus any cart
/// validation or lookup error.
pub async fn add_items<C>(db: &C, order_id: i64, lines: &[CartLine]) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let lines = normalize_cart(lines)?;
    let order = get_order(db, order_id).await?;
    ensure_open(&order)?;

    // Lines are unique per menu item after normalizing, so this snapshot stays valid
    let existing = get_order_items(db, order_id).await?;

    for line in &lines {
        let item = catalog::get_item(db, line.menu_item_id).await?;

        // Merge only into a line sold at the same price
        let mergeable = existing
            .iter()
            .rev()
            .find(|current| current.menu_item_id == item.id)
            .filter(|current| (current.unit_price - item.price).abs() < f64::EPSILON);

        if let Some(current) = mergeable {
            let quantity = current.quantity.checked_add(line.quantity).ok_or(
                Error::InvalidQuantity {
                    quantity: line.quantity,
                },
            )?;
            let mut active: order_item::ActiveModel = current.clone().into();
            active.quantity = Set(quantity);
            active.update(db).await?;
        } else {
            order_item::ActiveModel {
                order_id: Set(order_id),
                menu_item_id: Set(item.id),
                name: Set(item.name.clone()),
                unit_price: Set(item.price),
                quantity: Set(line.quantity),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    let updated = refresh_total(db, order).await?;
    debug!(
        order_id,
        lines = lines.len(),
        total = updated.total_price,
        "Items added to order"
    );
    Ok(updated)
}

/// Removes `quantity` units of a menu item from an open order, newest line first.
///
/// The caller is responsible for returning the units to stock.
///
/// # Errors
/// Returns `OrderClosed` if the order is not open and `InvalidQuantity` if the
/// order holds fewer units of the item than requested.
pub async fn void_items<C>(
    db: &C,
    order_id: i64,
    menu_item_id: i64,
    quantity: i32,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    require_positive_quantity(quantity)?;
    let order = get_order(db, order_id).await?;
    ensure_open(&order)?;

    let lines: Vec<order_item::Model> = get_order_items(db, order_id)
        .await?
        .into_iter()
        .filter(|line| line.menu_item_id == menu_item_id)
        .collect();

    let held: i64 = lines.iter().map(|line| i64::from(line.quantity)).sum();
    if held < i64::from(quantity) {
        return Err(Error::InvalidQuantity { quantity });
    }

    let mut remaining = quantity;
    for line in lines.into_iter().rev() {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(line.quantity);
        remaining -= taken;

        if taken == line.quantity {
            line.delete(db).await?;
        } else {
            let left = line.quantity - taken;
            let mut active: order_item::ActiveModel = line.into();
            active.quantity = Set(left);
            active.update(db).await?;
        }
    }

    let updated = refresh_total(db, order).await?;
    debug!(
        order_id,
        menu_item_id,
        quantity,
        total = updated.total_price,
        "Items voided"
    );
    Ok(updated)
}

/// Moves an order from `Open` to `Billed` and frees its table slot.
///
/// # Errors
/// Returns `OrderClosed` if the order is already billed or paid.
pub async fn close_for_billing<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = get_order(db, order_id).await?;
    if !order.status.can_close() {
        return Err(Error::OrderClosed {
            order_id,
            status: order.status.to_string(),
        });
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Billed);
    active.open_table_id = Set(None);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Moves an order from `Billed` to `Paid`.
///
/// # Errors
/// Returns `InvalidTransition` unless the order is billed.
pub async fn mark_paid<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = get_order(db, order_id).await?;
    if !order.status.can_pay() {
        return Err(Error::InvalidTransition {
            kind: "order",
            id: order_id,
            from: order.status.to_string(),
            action: "pay",
        });
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Paid);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_normalize_cart_merges_duplicates() {
        let merged =
            normalize_cart(&[CartLine::new(1, 2), CartLine::new(2, 1), CartLine::new(1, 3)])
                .unwrap();
        assert_eq!(merged, vec![CartLine::new(1, 5), CartLine::new(2, 1)]);
    }

    #[test]
    fn test_normalize_cart_rejects_bad_input() {
        assert!(matches!(normalize_cart(&[]), Err(Error::EmptyCart)));
        assert!(matches!(
            normalize_cart(&[CartLine::new(1, 0)]),
            Err(Error::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            normalize_cart(&[CartLine::new(1, i32::MAX), CartLine::new(1, 1)]),
            Err(Error::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_or_create_open_order_reuses_open_order() -> Result<()> {
        let (db, table) = setup_with_table().await?;

        let first = get_or_create_open_order(&db, table.id, "waiter-1").await?;
        let second = get_or_create_open_order(&db, table.id, "waiter-2").await?;

        assert_eq!(first.id, second.id);
        assert_eq!(first.status, OrderStatus::Open);
        assert_eq!(first.total_price, 0.0);
        assert_eq!(first.open_table_id, Some(table.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_second_open_order_for_table_is_rejected_by_store() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        get_or_create_open_order(&db, table.id, "waiter-1").await?;

        // Bypass the lookup, as a racing creator would
        let result = insert_order(&db, Some(table.id), "waiter-2").await;
        let err = result.unwrap_err();
        assert!(err.is_retryable());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_items_snapshots_price_and_totals() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let cake = create_stocked_item(&db, "Cake", 120.5, 10).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;

        let updated = add_items(
            &db,
            order.id,
            &[CartLine::new(tea.id, 2), CartLine::new(cake.id, 1)],
        )
        .await?;
        assert_eq!(updated.total_price, 240.5);

        let items = get_order_items(&db, order.id).await?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Tea");
        assert_eq!(items[0].unit_price, 60.0);
        assert_eq!(items[0].quantity, 2);

        let sum: f64 = items.iter().map(order_item::Model::line_total).sum();
        assert_eq!(updated.total_price, sum);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_items_merges_same_item() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;

        add_items(&db, order.id, &[CartLine::new(tea.id, 2)]).await?;
        let updated = add_items(&db, order.id, &[CartLine::new(tea.id, 3)]).await?;

        let items = get_order_items(&db, order.id).await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(updated.total_price, 300.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_price_change_starts_new_line() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;
        add_items(&db, order.id, &[CartLine::new(tea.id, 1)]).await?;

        let mut active: crate::entities::menu_item::ActiveModel = tea.clone().into();
        active.price = Set(70.0);
        active.update(&db).await?;

        let updated = add_items(&db, order.id, &[CartLine::new(tea.id, 1)]).await?;
        let items = get_order_items(&db, order.id).await?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, 60.0);
        assert_eq!(items[1].unit_price, 70.0);
        assert_eq!(updated.total_price, 130.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_items_to_billed_order_fails() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;
        add_items(&db, order.id, &[CartLine::new(tea.id, 1)]).await?;
        close_for_billing(&db, order.id).await?;

        let result = add_items(&db, order.id, &[CartLine::new(tea.id, 1)]).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::OrderClosed { status, .. } if status == "billed"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_order_state_machine() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;

        // Cannot pay an open order
        assert!(matches!(
            mark_paid(&db, order.id).await.unwrap_err(),
            Error::InvalidTransition { action: "pay", .. }
        ));

        let billed = close_for_billing(&db, order.id).await?;
        assert_eq!(billed.status, OrderStatus::Billed);
        assert_eq!(billed.open_table_id, None);
        assert!(get_open_order(&db, table.id).await?.is_none());

        // Closing twice is rejected
        assert!(matches!(
            close_for_billing(&db, order.id).await.unwrap_err(),
            Error::OrderClosed { .. }
        ));

        let paid = mark_paid(&db, order.id).await?;
        assert_eq!(paid.status, OrderStatus::Paid);

        assert!(matches!(
            close_for_billing(&db, order.id).await.unwrap_err(),
            Error::OrderClosed { status, .. } if status == "paid"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_void_items_newest_line_first() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;
        add_items(&db, order.id, &[CartLine::new(tea.id, 4)]).await?;

        let updated = void_items(&db, order.id, tea.id, 3).await?;
        assert_eq!(updated.total_price, 60.0);
        assert_eq!(get_order_items(&db, order.id).await?[0].quantity, 1);

        let emptied = void_items(&db, order.id, tea.id, 1).await?;
        assert_eq!(emptied.total_price, 0.0);
        assert!(get_order_items(&db, order.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_void_more_than_ordered_fails() -> Result<()> {
        let (db, table) = setup_with_table().await?;
        let tea = create_stocked_item(&db, "Tea", 60.0, 50).await?;
        let order = get_or_create_open_order(&db, table.id, "waiter-1").await?;
        add_items(&db, order.id, &[CartLine::new(tea.id, 2)]).await?;

        let result = void_items(&db, order.id, tea.id, 3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidQuantity { quantity: 3 }
        ));
        assert_eq!(get_order(&db, order.id).await?.total_price, 120.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_walk_in_order_has_no_table() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_walk_in_order(&db, "cashier-1").await?;
        let second = create_walk_in_order(&db, "cashier-1").await?;
        assert_eq!(first.table_id, None);
        assert_eq!(first.open_table_id, None);
        assert_ne!(first.id, second.id);
        Ok(())
    }
}
