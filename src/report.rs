/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The report module turns the aggregated changesets into a report document.

use crate::changesets::ChangesetSummary;
use crate::changesets::Changesets;
use crate::changesets::NodeRecord;
use crate::context;
use crate::viewport;
use crate::viewport::ViewportExtent;
use anyhow::Context as _;
use std::collections::BTreeMap;

/// Max number of changesets in a report.
pub const CHANGESET_LIMIT: usize = 1000;

/// Attached to the stats when the changesets are truncated.
pub const LIMIT_NOTE: &str =
    "Note: For performance reasons only the first 1000 changesets are displayed.";

/// Stat names which can't be used as rule names.
pub const RESERVED_STATS: [&str; 2] = ["total", "limit_exceed"];

/// Summary numbers of a report.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Stats {
    /// Number of changesets per rule name.
    #[serde(flatten)]
    pub rules: BTreeMap<String, usize>,
    /// Number of changesets, before truncation.
    pub total: usize,
    /// Set if the changesets are truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_exceed: Option<String>,
}

/// One changeset in a report.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReportChangeset {
    /// Changeset ID.
    pub id: i64,
    /// Display name of the editor.
    pub user: String,
    /// Numeric ID of the editor.
    pub uid: i64,
    /// Matched node IDs.
    pub node_ids: Vec<i64>,
    /// Matched way IDs.
    pub way_ids: Vec<i64>,
    /// Matched nodes.
    pub nodes: Vec<NodeRecord>,
    /// Number of matched elements per rule name.
    pub counts: BTreeMap<String, usize>,
    /// Sum of the per-rule counts.
    pub total: usize,
    /// Framing of the matched elements, if they have a location.
    pub viewport: Option<ViewportExtent>,
    /// Link to the viewport on openstreetmap.org.
    pub map_link: Option<String>,
}

impl From<ChangesetSummary> for ReportChangeset {
    fn from(summary: ChangesetSummary) -> Self {
        let viewport = viewport::compute_extent(&summary.points);
        ReportChangeset {
            id: summary.id,
            user: summary.user,
            uid: summary.uid,
            node_ids: summary.node_ids,
            way_ids: summary.way_ids,
            nodes: summary.nodes,
            counts: summary.counts,
            total: summary.total,
            map_link: viewport.map(|i| i.get_map_link()),
            viewport,
        }
    }
}

/// The report of one run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Report {
    /// Date of the run, e.g. "May 10, 2020".
    pub date: String,
    /// Rule names, in config order.
    pub rules: Vec<String>,
    /// Summary numbers.
    pub stats: Stats,
    /// The changesets, ordered by ID.
    pub changesets: Vec<ReportChangeset>,
}

/// Builds the report from the aggregated changesets. The stats describe all changesets, even if
/// the list of changesets is truncated.
pub fn make_report(ctx: &context::Context, changesets: Changesets) -> anyhow::Result<Report> {
    let format = time::format_description::parse_borrowed::<1>("[month repr:long] [day], [year]")?;
    let date = ctx.get_time().now().format(&format)?;
    let rules = changesets.get_rule_names().to_vec();
    let mut stats = Stats {
        rules: changesets.get_rule_stats(),
        total: changesets.len(),
        limit_exceed: None,
    };

    let mut summaries = changesets.finalize();
    if summaries.len() > CHANGESET_LIMIT {
        log::info!(
            "make_report: truncating {} changesets to {}",
            summaries.len(),
            CHANGESET_LIMIT
        );
        summaries.truncate(CHANGESET_LIMIT);
        stats.limit_exceed = Some(LIMIT_NOTE.into());
    }

    Ok(Report {
        date,
        rules,
        stats,
        changesets: summaries.into_iter().map(ReportChangeset::from).collect(),
    })
}

/// Gets the default output path, which contains the date of the run.
pub fn get_default_output_path(ctx: &context::Context) -> anyhow::Result<String> {
    let format = time::format_description::parse_borrowed::<1>("[month]-[day]-[year repr:last_two]")?;
    let date = ctx.get_time().now().format(&format)?;
    Ok(ctx.get_abspath(&format!("workdir/osm_change_report_{date}.json")))
}

/// Writes the report as JSON to the configured path, returns that path.
pub fn write_report(ctx: &context::Context, report: &Report) -> anyhow::Result<String> {
    let path = match ctx.get_ini().get_report_output() {
        Some(value) => value,
        None => get_default_output_path(ctx)?,
    };
    let json = serde_json::to_string_pretty(report)?;
    ctx.get_file_system()
        .write_from_string(&json, &path)
        .with_context(|| format!("failed to write '{path}'"))?;
    Ok(path)
}

#[cfg(test)]
mod tests;
