//! Catalog store - Menu items with price and stock.
//!
//! Stock changes are single conditional `UPDATE` statements, so the check and the
//! decrement cannot be split by a concurrent writer:
//! `UPDATE menu_items SET stock = stock - qty WHERE id = ? AND stock >= qty`.
//! [`reserve_stock`] and [`release_stock`] accept any connection so the settlement
//! coordinator can run them inside its transaction; they are never meant to be
//! called on their own.

use crate::{
    core::money::{require_non_negative, require_positive_quantity},
    entities::{MenuItem, StockType, menu_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::debug;

/// Finds a menu item by ID.
///
/// # Errors
/// Returns `EntityNotFound` if no item has this ID.
pub async fn get_item<C>(db: &C, item_id: i64) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    MenuItem::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("menu_item", item_id))
}

/// Lists items that can currently be sold, ordered by name.
pub async fn list_available_items(db: &DatabaseConnection) -> Result<Vec<menu_item::Model>> {
    MenuItem::find()
        .filter(menu_item::Column::Available.eq(true))
        .order_by_asc(menu_item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a menu item. Passing `Some(stock)` makes it inventoried.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The price is negative or not finite
/// - The initial stock is negative
pub async fn create_menu_item<C>(
    db: &C,
    name: &str,
    price: f64,
    stock: Option<i64>,
) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Menu item name cannot be empty".to_string(),
        });
    }
    require_non_negative(price)?;
    if let Some(count) = stock.filter(|count| *count < 0) {
        return Err(Error::InvalidQuantity {
            quantity: i32::try_from(count).unwrap_or(i32::MIN),
        });
    }

    let now = chrono::Utc::now();
    let stock_type = if stock.is_some() {
        StockType::Inventoried
    } else {
        StockType::NonInventoried
    };

    let item = menu_item::ActiveModel {
        name: Set(name.trim().to_string()),
        price: Set(price),
        stock_type: Set(stock_type),
        stock: Set(stock),
        available: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    item.insert(db).await.map_err(Into::into)
}

/// Switches an item on or off for sale.
pub async fn set_item_availability<C>(
    db: &C,
    item_id: i64,
    available: bool,
) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    let mut item: menu_item::ActiveModel = get_item(db, item_id).await?.into();
    item.available = Set(available);
    item.updated_at = Set(chrono::Utc::now());
    item.update(db).await.map_err(Into::into)
}

/// Decrements stock by `quantity` if enough is on hand.
///
/// Non-inventoried items always succeed and are left untouched.
///
/// # Errors
/// Returns:
/// - `InvalidQuantity` for a zero or negative quantity
/// - `EntityNotFound` if the item does not exist
/// - `ItemUnavailable` if the item is switched off
/// - `InsufficientStock` if the decrement would drive stock below zero
pub async fn reserve_stock<C>(db: &C, item_id: i64, quantity: i32) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    require_positive_quantity(quantity)?;

    let item = get_item(db, item_id).await?;
    if !item.available {
        return Err(Error::ItemUnavailable { item_id });
    }
    if !item.is_inventoried() {
        return Ok(item);
    }

    let requested = i64::from(quantity);
    let result = MenuItem::update_many()
        .col_expr(
            menu_item::Column::Stock,
            Expr::col(menu_item::Column::Stock).sub(requested),
        )
        .col_expr(
            menu_item::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(menu_item::Column::Id.eq(item_id))
        .filter(menu_item::Column::Stock.gte(requested))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InsufficientStock {
            item_id,
            requested: quantity,
            available: item.stock.unwrap_or(0),
        });
    }

    let updated = get_item(db, item_id).await?;
    debug!(item_id, quantity, remaining = ?updated.stock, "Stock reserved");
    Ok(updated)
}

/// Returns `quantity` units to stock. No-op for non-inventoried items.
///
/// # Errors
/// Returns `InvalidQuantity` for a zero or negative quantity and
/// `EntityNotFound` if the item does not exist.
pub async fn release_stock<C>(db: &C, item_id: i64, quantity: i32) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    require_positive_quantity(quantity)?;

    let item = get_item(db, item_id).await?;
    if !item.is_inventoried() {
        return Ok(item);
    }

    MenuItem::update_many()
        .col_expr(
            menu_item::Column::Stock,
            Expr::col(menu_item::Column::Stock).add(i64::from(quantity)),
        )
        .col_expr(
            menu_item::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(menu_item::Column::Id.eq(item_id))
        .exec(db)
        .await?;

    let updated = get_item(db, item_id).await?;
    debug!(item_id, quantity, remaining = ?updated.stock, "Stock released");
    Ok(updated)
}
