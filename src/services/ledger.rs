//! Wallet money movement. Every balance change is paired with an appended
//! `wallet_transactions` row inside the caller's transaction, so the cached
//! balance always equals the sum of the account's entries.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::db::queries::{self, NewWalletTransaction};
use crate::errors::AppError;
use crate::models::{EntryKind, WalletTransaction};

pub struct Posting<'a> {
    pub account_id: &'a str,
    pub amount: Decimal,
    pub kind: EntryKind,
    pub description: String,
    pub reference_id: Option<&'a str>,
    pub at: DateTime<Utc>,
}

fn ensure_positive(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount.round_dp(2) != amount {
        return Err(AppError::Validation(format!(
            "amount must have at most two decimal places, got {amount}"
        )));
    }
    Ok(())
}

/// Removes `amount` from the wallet and records a negative entry. Fails with
/// `InsufficientFunds` without touching anything when the balance is short.
pub fn debit(tx: &Transaction<'_>, posting: Posting<'_>) -> Result<Decimal, AppError> {
    ensure_positive(posting.amount)?;

    if !queries::debit_wallet(tx, posting.account_id, posting.amount)? {
        let balance = queries::get_wallet_balance(tx, posting.account_id)?
            .ok_or_else(|| AppError::NotFound(format!("account {}", posting.account_id)))?;
        tracing::warn!(
            account_id = posting.account_id,
            balance = %balance,
            required = %posting.amount,
            "debit rejected: insufficient funds"
        );
        return Err(AppError::InsufficientFunds {
            balance,
            required: posting.amount,
        });
    }

    queries::insert_wallet_transaction(
        tx,
        &NewWalletTransaction {
            account_id: posting.account_id,
            amount: -posting.amount,
            kind: posting.kind,
            description: &posting.description,
            reference_id: posting.reference_id,
            created_at: posting.at,
        },
    )?;

    let balance = current_balance(tx, posting.account_id)?;
    tracing::info!(
        account_id = posting.account_id,
        amount = %posting.amount,
        kind = posting.kind.as_str(),
        balance = %balance,
        "wallet debited"
    );
    Ok(balance)
}

/// Adds `amount` to the wallet and records a positive entry.
pub fn credit(tx: &Transaction<'_>, posting: Posting<'_>) -> Result<Decimal, AppError> {
    ensure_positive(posting.amount)?;

    if !queries::credit_wallet(tx, posting.account_id, posting.amount)? {
        return Err(AppError::NotFound(format!("account {}", posting.account_id)));
    }

    queries::insert_wallet_transaction(
        tx,
        &NewWalletTransaction {
            account_id: posting.account_id,
            amount: posting.amount,
            kind: posting.kind,
            description: &posting.description,
            reference_id: posting.reference_id,
            created_at: posting.at,
        },
    )?;

    let balance = current_balance(tx, posting.account_id)?;
    tracing::info!(
        account_id = posting.account_id,
        amount = %posting.amount,
        kind = posting.kind.as_str(),
        balance = %balance,
        "wallet credited"
    );
    Ok(balance)
}

pub fn current_balance(conn: &Connection, account_id: &str) -> Result<Decimal, AppError> {
    queries::get_wallet_balance(conn, account_id)?
        .ok_or_else(|| AppError::NotFound(format!("account {account_id}")))
}

pub fn history(
    conn: &Connection,
    account_id: &str,
    limit: i64,
) -> Result<Vec<WalletTransaction>, AppError> {
    current_balance(conn, account_id)?;
    Ok(queries::get_wallet_transactions(conn, account_id, limit)?)
}

pub fn deposit(
    conn: &mut Connection,
    account_id: &str,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let balance = credit(
        &tx,
        Posting {
            account_id,
            amount,
            kind: EntryKind::Deposit,
            description: format!("Deposit of {amount} to wallet"),
            reference_id: None,
            at: now,
        },
    )?;
    tx.commit()?;
    Ok(balance)
}

pub fn withdraw(
    conn: &mut Connection,
    account_id: &str,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let balance = debit(
        &tx,
        Posting {
            account_id,
            amount,
            kind: EntryKind::Withdrawal,
            description: format!("Withdrawal of {amount} from wallet"),
            reference_id: None,
            at: now,
        },
    )?;
    tx.commit()?;
    Ok(balance)
}
