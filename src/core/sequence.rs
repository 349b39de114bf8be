//! Bill-number sequence.
//!
//! Bill numbers come from a counter row in the `system_state` table that is
//! incremented inside the transaction issuing the bill. Writers serialize on the
//! row, and the unique `bill_number` column turns any leftover race into a
//! retryable conflict instead of a duplicate number.

use crate::{
    entities::{SystemState, system_state},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

const BILL_SEQUENCE_KEY: &str = "bill_sequence";

/// Reads the last issued sequence value, 0 if none has been issued.
pub async fn current_bill_sequence<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(BILL_SEQUENCE_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => s.value.parse::<u64>().map_err(|e| Error::Config {
            message: format!("Corrupt bill sequence value {:?}: {e}", s.value),
        }),
        None => Ok(0),
    }
}

/// Advances the sequence and returns the new value.
pub async fn next_bill_sequence<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(BILL_SEQUENCE_KEY))
        .one(db)
        .await?;

    let next = if let Some(state) = existing {
        let current = state.value.parse::<u64>().map_err(|e| Error::Config {
            message: format!("Corrupt bill sequence value {:?}: {e}", state.value),
        })?;
        let next = current + 1;
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(next.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
        next
    } else {
        system_state::ActiveModel {
            key: Set(BILL_SEQUENCE_KEY.to_string()),
            value: Set("1".to_string()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        1
    };

    Ok(next)
}

/// Formats a bill number, e.g. `BILL-000042`.
#[must_use]
pub fn format_bill_number(prefix: &str, sequence: u64) -> String {
    format!("{prefix}-{sequence:06}")
}

/// Advances the sequence and returns the formatted bill number.
pub async fn next_bill_number<C>(db: &C, prefix: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let sequence = next_bill_sequence(db).await?;
    Ok(format_bill_number(prefix, sequence))
}
