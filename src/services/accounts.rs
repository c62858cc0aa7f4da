use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Account, EntryKind, Role};
use crate::services::ledger::{self, Posting};

/// Creates an account with an empty wallet. Customers then receive the signup
/// credit as a `bonus` entry; hosts and admins start at zero.
pub fn register_account(
    conn: &mut Connection,
    username: &str,
    role: Role,
    signup_credit: Decimal,
    now: DateTime<Utc>,
) -> Result<Account, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }

    let mut account = Account {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        role,
        wallet_balance: Decimal::ZERO,
        is_active: true,
        created_at: now,
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::insert_account(&tx, &account).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Validation(format!("username {username} is already taken"))
        }
        other => AppError::Storage(other),
    })?;

    if role == Role::Customer && signup_credit > Decimal::ZERO {
        account.wallet_balance = ledger::credit(
            &tx,
            Posting {
                account_id: &account.id,
                amount: signup_credit,
                kind: EntryKind::Bonus,
                description: "Welcome credit".to_string(),
                reference_id: None,
                at: now,
            },
        )?;
    }

    tx.commit()?;

    tracing::info!(account_id = %account.id, role = role.as_str(), "account registered");
    Ok(account)
}

pub fn get_account(conn: &Connection, id: &str) -> Result<Account, AppError> {
    queries::get_account(conn, id)?.ok_or_else(|| AppError::NotFound(format!("account {id}")))
}

/// Accounts are never deleted; deactivated ones can no longer book.
pub fn deactivate_account(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::set_account_active(conn, id, false)? {
        return Err(AppError::NotFound(format!("account {id}")));
    }
    tracing::info!(account_id = id, "account deactivated");
    Ok(())
}
