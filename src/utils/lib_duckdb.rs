use std::time::Duration;

use duckdb::{AccessMode, Config};
use jiff::{
    civil::{date, Date},
    ToSpan,
};
use log::warn;

/// Use this function to open a DuckDB connection.  Another process may hold
/// the file lock for a short while, so retry with an exponential backoff.
/// Suggested `max_attempts = 8`, `initial_wait = Duration::from_millis(25)`.
pub fn open_with_retry(
    duckdb_path: &str,
    max_attempts: u32,
    initial_wait: Duration,
    access_mode: AccessMode,
) -> Result<duckdb::Connection, duckdb::Error> {
    let mut attempts = 0;
    let mut wait_duration = initial_wait;

    loop {
        // `AccessMode` does not implement `Clone`; rebuild the same variant.
        let mode = match access_mode {
            AccessMode::Automatic => AccessMode::Automatic,
            AccessMode::ReadOnly => AccessMode::ReadOnly,
            AccessMode::ReadWrite => AccessMode::ReadWrite,
        };
        let config = Config::default().access_mode(mode)?;
        match duckdb::Connection::open_with_flags(duckdb_path, config) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(e);
                }
                warn!(
                    "Retrying to open {} after error: {} (attempt {}/{})",
                    duckdb_path, e, attempts, max_attempts
                );
                std::thread::sleep(wait_duration);
                wait_duration *= 2;
            }
        }
    }
}

/// SQL expression for the number of days between the epoch and a DATE column.
/// Read it back with [`date_from_epoch_days`].
pub fn epoch_days(column: &str) -> String {
    format!("({} - DATE '1970-01-01')::INTEGER", column)
}

pub fn date_from_epoch_days(n: i32) -> Date {
    date(1970, 1, 1).saturating_add(n.days())
}
