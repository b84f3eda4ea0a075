/*
 * Copyright 2022 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Trait implementations using the real file system, network, time, etc.

use super::*;
use isahc::ReadResponseExt as _;
use isahc::RequestExt as _;
use isahc::config::Configurable as _;
use std::path::Path;
use std::time::Duration;

/// File system implementation, backed by the Rust stdlib.
pub struct StdFileSystem {}

// Real file-system is intentionally mocked.
impl FileSystem for StdFileSystem {
    fn path_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn read_to_string(&self, path: &str) -> anyhow::Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("failed to open {path} for reading"))
    }

    fn write_from_string(&self, data: &str, path: &str) -> anyhow::Result<()> {
        // Create containing directory if needed.
        let dir = Path::new(path)
            .parent()
            .context("failed to get parent dir")?;
        std::fs::create_dir_all(dir)?;

        std::fs::write(path, data).with_context(|| format!("failed to open {path} for writing"))
    }
}

/// Network implementation, backed by a real HTTP library.
pub struct StdNetwork {}

// Real network is intentionally mocked.
impl Network for StdNetwork {
    fn urlopen(&self, url: &str, data: &str) -> anyhow::Result<String> {
        let mut buf = if !data.is_empty() {
            isahc::Request::post(url)
                .redirect_policy(isahc::config::RedirectPolicy::Limit(1))
                .timeout(Duration::from_secs(425))
                .body(data.to_string())?
                .send()?
        } else {
            isahc::Request::get(url)
                .redirect_policy(isahc::config::RedirectPolicy::Limit(1))
                .timeout(Duration::from_secs(425))
                .body(())?
                .send()?
        };

        let status = buf.status();
        if !status.is_success() {
            return Err(HttpStatusError {
                status: status.as_u16(),
                url: url.into(),
            }
            .into());
        }

        let ret = buf.text()?;
        Ok(ret)
    }
}

/// Time implementation, backed by the the actual time.
pub struct StdTime {}

// Real time is intentionally mocked.
impl Time for StdTime {
    fn now(&self) -> time::OffsetDateTime {
        time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc())
    }

    fn sleep(&self, seconds: u64) {
        std::thread::sleep(Duration::from_secs(seconds));
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Database implementation, backed by a SQLite file.
pub struct StdDatabase {
    path: String,
}

impl StdDatabase {
    /// Creates a new StdDatabase, the file is created on first open.
    pub fn new(path: &str) -> Self {
        StdDatabase { path: path.into() }
    }
}

impl Database for StdDatabase {
    fn open(&self) -> anyhow::Result<rusqlite::Connection> {
        if let Some(dir) = Path::new(&self.path).parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = rusqlite::Connection::open(&self.path)
            .with_context(|| format!("failed to open database '{}'", self.path))?;
        crate::sql::init(&conn)?;
        Ok(conn)
    }
}
