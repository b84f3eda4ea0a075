/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Abstractions to help writing unit tests: filesystem, network, etc.

use anyhow::Context as _;
use std::sync::Arc;

mod system;

/// File system interface.
pub trait FileSystem: Send + Sync {
    /// Test whether a path exists.
    fn path_exists(&self, path: &str) -> bool;

    /// Reads the whole file into a string.
    fn read_to_string(&self, path: &str) -> anyhow::Result<String>;

    /// Writes the whole string to a file, creating it if needed.
    fn write_from_string(&self, data: &str, path: &str) -> anyhow::Result<()>;
}

/// A HTTP request that completed with a non-success status code.
#[derive(Debug)]
pub struct HttpStatusError {
    /// The HTTP status code, e.g. 404.
    pub status: u16,
    /// The requested URL.
    pub url: String,
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP status {} for '{}'", self.status, self.url)
    }
}

impl std::error::Error for HttpStatusError {}

/// Network interface.
pub trait Network: Send + Sync {
    /// Opens an URL. Empty data means HTTP GET, otherwise it means a HTTP POST. A non-success
    /// status is reported as an error wrapping HttpStatusError.
    fn urlopen(&self, url: &str, data: &str) -> anyhow::Result<String>;
}

/// Time interface.
pub trait Time: Send + Sync {
    /// Calculates the current time.
    fn now(&self) -> time::OffsetDateTime;

    /// Delay execution for a given number of seconds.
    fn sleep(&self, seconds: u64);

    /// Allows accessing the implementing struct.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Database interface.
pub trait Database: Send + Sync {
    /// Opens a connection with an up to date schema.
    fn open(&self) -> anyhow::Result<rusqlite::Connection>;
}

/// Configuration file reader.
#[derive(Clone)]
pub struct Ini {
    config: crate::serde::ConfigFile,
    root: String,
}

impl Ini {
    /// Reads the config from `config_path`. A missing file means the default config.
    pub fn new(
        file_system: &Arc<dyn FileSystem>,
        config_path: &str,
        root: &str,
    ) -> anyhow::Result<Self> {
        if !file_system.path_exists(config_path) {
            return Ini::from_toml("", root);
        }

        let data = file_system.read_to_string(config_path)?;
        Ini::from_toml(&data, root).context(format!("failed to parse '{config_path}'"))
    }

    /// Parses the config from a TOML string.
    pub fn from_toml(data: &str, root: &str) -> anyhow::Result<Self> {
        let config: crate::serde::ConfigFile = toml::from_str(data)?;
        Ok(Ini {
            config,
            root: root.into(),
        })
    }

    /// Gets the absolute path of the GeoJSON file describing the area of interest.
    pub fn get_area_geojson_path(&self) -> Option<String> {
        self.config
            .area
            .geojson
            .as_ref()
            .map(|path| make_abspath(&self.root, path))
    }

    /// Gets the area of interest as [north, east, south, west].
    pub fn get_area_bbox(&self) -> Option<[f64; 4]> {
        self.config.area.bbox
    }

    /// Gets the watch rule definitions, in config order.
    pub fn get_rules(&self) -> &[crate::serde::RuleConfig] {
        &self.config.rules
    }

    /// Gets the base URI of the OSM API serving element history.
    pub fn get_history_api_uri(&self) -> String {
        self.config
            .history
            .api_uri
            .clone()
            .unwrap_or_else(|| "https://api.openstreetmap.org".into())
    }

    /// Gets how many extra attempts a failed history lookup gets.
    pub fn get_history_retries(&self) -> u32 {
        self.config.history.retries.unwrap_or(3)
    }

    /// Gets the base delay between history lookup attempts, in seconds.
    pub fn get_history_retry_sleep(&self) -> u64 {
        self.config.history.retry_sleep.unwrap_or(1)
    }

    /// Decides if history snapshots should be cached in the database.
    pub fn get_history_cache(&self) -> bool {
        self.config.history.cache.unwrap_or(true)
    }

    /// Gets the number of way workers, 0 means one per available CPU.
    pub fn get_dispatch_workers(&self) -> usize {
        self.config.dispatch.workers.unwrap_or(0)
    }

    /// Gets the absolute path of the report output, if configured.
    pub fn get_report_output(&self) -> Option<String> {
        self.config
            .report
            .output
            .as_ref()
            .map(|path| make_abspath(&self.root, path))
    }
}

fn make_abspath(root: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.into();
    }

    format!("{}/{}", root.trim_end_matches('/'), path)
}

/// Context owns global state which is set up once and then read everywhere.
#[derive(Clone)]
pub struct Context {
    root: String,
    ini: Ini,
    file_system: Arc<dyn FileSystem>,
    network: Arc<dyn Network>,
    time: Arc<dyn Time>,
    database: Arc<dyn Database>,
}

impl Context {
    /// Creates a new Context, `prefix` is relative to the current directory.
    pub fn new(prefix: &str) -> anyhow::Result<Self> {
        let current_dir = std::env::current_dir().context("failed to get current dir")?;
        let current_dir = current_dir
            .to_str()
            .context("current dir is not valid UTF-8")?;
        let root = if prefix.is_empty() {
            current_dir.to_string()
        } else {
            format!("{current_dir}/{prefix}")
        };
        let file_system: Arc<dyn FileSystem> = Arc::new(system::StdFileSystem {});
        let ini = Ini::new(
            &file_system,
            &make_abspath(&root, "workdir/changewithin.toml"),
            &root,
        )?;
        let network: Arc<dyn Network> = Arc::new(system::StdNetwork {});
        let time: Arc<dyn Time> = Arc::new(system::StdTime {});
        let database: Arc<dyn Database> = Arc::new(system::StdDatabase::new(&make_abspath(
            &root,
            "workdir/changewithin.db",
        )));
        Ok(Context {
            root,
            ini,
            file_system,
            network,
            time,
            database,
        })
    }

    /// Make a path absolute, taking the repo root as a base dir.
    pub fn get_abspath(&self, rel_path: &str) -> String {
        make_abspath(&self.root, rel_path)
    }

    /// Gets the config.
    pub fn get_ini(&self) -> &Ini {
        &self.ini
    }

    /// Sets the config.
    pub fn set_ini(&mut self, ini: Ini) {
        self.ini = ini;
    }

    /// Gets the file system implementation.
    pub fn get_file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    /// Sets the file system implementation.
    pub fn set_file_system(&mut self, file_system: &Arc<dyn FileSystem>) {
        self.file_system = file_system.clone();
    }

    /// Gets the network implementation.
    pub fn get_network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Sets the network implementation.
    pub fn set_network(&mut self, network: Arc<dyn Network>) {
        self.network = network;
    }

    /// Gets the time implementation.
    pub fn get_time(&self) -> &Arc<dyn Time> {
        &self.time
    }

    /// Sets the time implementation.
    pub fn set_time(&mut self, time: &Arc<dyn Time>) {
        self.time = time.clone();
    }

    /// Opens a database connection.
    pub fn get_database_connection(&self) -> anyhow::Result<rusqlite::Connection> {
        self.database.open()
    }

    /// Sets the database implementation.
    pub fn set_database(&mut self, database: &Arc<dyn Database>) {
        self.database = database.clone();
    }
}
