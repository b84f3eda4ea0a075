/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The process module runs a change feed through the filters and aggregates the matches.

use crate::changesets::Changesets;
use crate::changesets::NodeRecord;
use crate::context;
use crate::dispatch;
use crate::element::ElementKind;
use crate::element::RawElement;
use crate::geometry;
use crate::geometry::AreaOfInterest;
use crate::geometry::Location;
use crate::history;
use crate::history::HistorySource;
use crate::osc;
use crate::report;
use crate::tags;
use crate::tags::WatchRule;
use anyhow::Context as _;
use std::collections::HashMap;
use std::io::Write;

/// Nodes inside the area of interest, by ID.
pub type NodeMap = HashMap<i64, NodeRecord>;

/// Number of elements seen, by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementCounts {
    /// Nodes.
    pub nodes: usize,
    /// Ways.
    pub ways: usize,
    /// Relations.
    pub relations: usize,
}

/// Read-only state shared by the node and way passes.
pub struct Filters<'a> {
    area: &'a AreaOfInterest,
    rules: &'a [WatchRule],
    history: &'a dyn HistorySource,
}

impl<'a> Filters<'a> {
    /// Creates a new Filters.
    pub fn new(
        area: &'a AreaOfInterest,
        rules: &'a [WatchRule],
        history: &'a dyn HistorySource,
    ) -> Self {
        Filters {
            area,
            rules,
            history,
        }
    }

    /// Gets the rules which match `element` and where the watched tags changed.
    fn get_matching_rules(&self, element: &RawElement) -> Vec<&'a WatchRule> {
        let kind = element.kind();
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(kind))
            .filter(|rule| tags::has_watched_tag(element, rule))
            .filter(|rule| history::has_tag_changed(self.history, element, rule.get_key()))
            .collect()
    }

    /// Processes one node: remembers it if it's inside the area, then records its matches.
    pub fn process_node(
        &self,
        node: &RawElement,
        node_map: &mut NodeMap,
        changesets: &mut Changesets,
    ) -> anyhow::Result<()> {
        let location = match node.location() {
            Some(value) => value,
            None => return Ok(()),
        };
        if !self.area.contains(Some(location)) {
            return Ok(());
        }

        let record = *node_map
            .entry(node.id)
            .or_insert_with(|| NodeRecord::new(node.id, location));
        for rule in self.get_matching_rules(node) {
            changesets.add_changeset(node);
            changesets.record_node_match(rule.get_name(), node.changeset, record)?;
        }
        Ok(())
    }

    /// Processes one way: it's inside the area if one of its nodes is accepted and inside the
    /// bbox of the area.
    pub fn process_way(
        &self,
        way: &RawElement,
        node_map: &NodeMap,
        changesets: &mut Changesets,
    ) -> anyhow::Result<()> {
        let locations: Vec<Option<Location>> = way
            .node_ids()
            .iter()
            .map(|id| node_map.get(id).map(|node| node.location()))
            .collect();
        if !geometry::way_in_bounding_box(locations.iter().cloned(), self.area.get_bbox()) {
            return Ok(());
        }

        let vertices: Vec<Location> = locations.into_iter().flatten().collect();
        for rule in self.get_matching_rules(way) {
            changesets.add_changeset(way);
            changesets.record_way_match(rule.get_name(), way.changeset, way.id, vertices.clone())?;
        }
        Ok(())
    }
}

/// Runs the node pass in feed order, then the way pass on `workers` workers. Relations are only
/// counted.
pub fn process_elements(
    elements: &[RawElement],
    filters: &Filters<'_>,
    workers: usize,
) -> anyhow::Result<(ElementCounts, Changesets)> {
    let rule_names: Vec<String> = filters
        .rules
        .iter()
        .map(|rule| rule.get_name().to_string())
        .collect();
    let mut counts = ElementCounts::default();
    let mut node_map = NodeMap::new();
    let mut changesets = Changesets::new(&rule_names);
    let mut ways: Vec<&RawElement> = Vec::new();
    for element in elements {
        match element.kind() {
            ElementKind::Node => {
                counts.nodes += 1;
                filters
                    .process_node(element, &mut node_map, &mut changesets)
                    .with_context(|| format!("failed to process node {}", element.id))?;
            }
            ElementKind::Way => {
                counts.ways += 1;
                ways.push(element);
            }
            ElementKind::Relation => counts.relations += 1,
        }
    }
    log::info!(
        "process_elements: {} nodes, {} inside the area",
        counts.nodes,
        node_map.len()
    );

    let node_map = &node_map;
    let way_changesets = dispatch::dispatch(&ways, workers, &rule_names, |way, partial| {
        filters
            .process_way(way, node_map, partial)
            .with_context(|| format!("failed to process way {}", way.id))
    })?;
    changesets.merge(way_changesets);
    log::info!(
        "process_elements: {} ways, {} relations, {} changesets",
        counts.ways,
        counts.relations,
        changesets.len()
    );
    Ok((counts, changesets))
}

/// Processes the feed at `osc_path` and writes the report, returns the element counts, the
/// number of changesets and the report path.
pub fn process_file(
    ctx: &context::Context,
    osc_path: &str,
) -> anyhow::Result<(ElementCounts, usize, String)> {
    let area = AreaOfInterest::from_config(ctx)?;
    let rules = tags::load_rules(ctx)?;
    let history = history::make_history_source(ctx)?;
    let workers = dispatch::get_worker_count(ctx.get_ini().get_dispatch_workers());

    let xml = ctx.get_file_system().read_to_string(osc_path)?;
    let elements = osc::read_osc(&xml).with_context(|| format!("failed to read '{osc_path}'"))?;
    log::info!("process_file: read {} elements", elements.len());

    let filters = Filters::new(&area, &rules, history.as_ref());
    let (counts, changesets) = process_elements(&elements, &filters, workers)?;
    let report = report::make_report(ctx, changesets)?;
    let path = report::write_report(ctx, &report)?;
    Ok((counts, report.stats.total, path))
}

fn our_main(argv: &[String], stream: &mut dyn Write, ctx: &context::Context) -> anyhow::Result<()> {
    let osc = clap::Arg::new("osc")
        .required(true)
        .help("the OsmChange file to process");
    let app = clap::Command::new("changewithin process").arg(osc);
    let args = app.try_get_matches_from(argv)?;
    let osc_path = args
        .get_one::<String>("osc")
        .context("missing OsmChange file")?;

    let (counts, changesets, path) = process_file(ctx, osc_path)?;
    stream.write_all(
        format!(
            "Processed {} nodes, {} ways and {} relations: {} changesets, wrote '{}'\n",
            counts.nodes, counts.ways, counts.relations, changesets, path
        )
        .as_bytes(),
    )?;
    Ok(())
}

/// Commandline interface to this module.
pub fn main(argv: &[String], stream: &mut dyn Write, ctx: &context::Context) -> i32 {
    match our_main(argv, stream, ctx) {
        Ok(_) => 0,
        Err(err) => {
            stream.write_all(format!("{err:?}\n").as_bytes()).unwrap();
            1
        }
    }
}

/// Commandline interface to print the bbox of the area of interest.
pub fn area_main(_argv: &[String], stream: &mut dyn Write, ctx: &context::Context) -> i32 {
    let ret = AreaOfInterest::from_config(ctx).and_then(|area| {
        let json = serde_json::to_string(&area.get_bbox().to_array())?;
        stream.write_all(format!("{json}\n").as_bytes())?;
        Ok(())
    });
    match ret {
        Ok(_) => 0,
        Err(err) => {
            stream.write_all(format!("{err:?}\n").as_bytes()).unwrap();
            1
        }
    }
}
