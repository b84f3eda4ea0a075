/*
 * Copyright 2023 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Database schema creation / migration.

use anyhow::Context as _;

/// Creates or upgrades the schema of `conn`.
pub fn init(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    let mut stmt = conn.prepare("pragma user_version")?;
    let mut rows = stmt.query([])?;
    let row = rows.next()?.context("no row")?;
    let user_version: i64 = row.get(0).context("no col")?;
    if user_version < 1 {
        // Tags of previous element revisions, as a JSON object.
        conn.execute(
            "create table history_snapshots (
            kind text not null,
            id integer not null,
            version integer not null,
            tags text not null,
            primary key (kind, id, version)
         )",
            [],
        )?;
    }

    conn.execute("pragma user_version = 1", [])?;
    Ok(())
}

/// Ignores a primary key constraint violation error, but not other errors.
pub fn ignore_primary_key_constraint(
    result: Result<usize, rusqlite::Error>,
) -> Result<(), rusqlite::Error> {
    match result {
        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
            },
            _,
        )) => Ok(()),
        Err(err) => Err(err),
        Ok(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests;
