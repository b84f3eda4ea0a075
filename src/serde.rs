/*
 * Copyright 2025 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The serde module contains structs used while parsing data using the serde crate.

use std::collections::BTreeMap;

/// ConfigFile is the root of workdir/changewithin.toml.
#[derive(Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// The area of interest.
    pub area: AreaConfig,
    /// The watch rules, in report order.
    pub rules: Vec<RuleConfig>,
    /// How to look up previous revisions.
    pub history: HistoryConfig,
    /// How to spread way processing.
    pub dispatch: DispatchConfig,
    /// Where to put the result.
    pub report: ReportConfig,
}

/// AreaConfig is the [area] section.
#[derive(Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    /// Path of a GeoJSON file with the area polygon.
    pub geojson: Option<String>,
    /// North, east, south, west.
    pub bbox: Option<[f64; 4]>,
}

/// RuleConfig is one [[rules]] entry.
#[derive(Clone, serde::Deserialize)]
pub struct RuleConfig {
    /// Unique name of the rule.
    pub name: String,
    /// Regex for the tag key.
    pub key: String,
    /// Regex for the tag value, matches anything if missing.
    pub value: Option<String>,
    /// Element kinds: "node", "way" or "relation".
    pub types: Option<Vec<String>>,
}

/// HistoryConfig is the [history] section.
#[derive(Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Base URI of the OSM API.
    pub api_uri: Option<String>,
    /// Extra attempts after a failed lookup.
    pub retries: Option<u32>,
    /// Base delay between attempts, in seconds.
    pub retry_sleep: Option<u64>,
    /// Cache snapshots in the database.
    pub cache: Option<bool>,
}

/// DispatchConfig is the [dispatch] section.
#[derive(Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of way workers.
    pub workers: Option<usize>,
}

/// ReportConfig is the [report] section.
#[derive(Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output path of the JSON report.
    pub output: Option<String>,
}

/// OsmApiElement is one element revision from the OSM API.
#[derive(serde::Deserialize)]
pub struct OsmApiElement {
    /// Element ID.
    pub id: i64,
    /// Revision of the element.
    pub version: u64,
    /// Tags of this revision, missing when there are none.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// OsmApiResult is the result of an OSM API element query.
#[derive(serde::Deserialize)]
pub struct OsmApiResult {
    /// Matching element revisions.
    #[serde(default)]
    pub elements: Vec<OsmApiElement>,
}
