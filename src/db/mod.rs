pub mod migrations;
pub mod queries;
pub mod sql;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    // Writers queue on the database lock instead of failing with SQLITE_BUSY.
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
