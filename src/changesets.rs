/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The changesets module aggregates matching elements into per-changeset records.

use crate::element::RawElement;
use crate::geometry::Location;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// A node inside the area of interest.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct NodeRecord {
    /// Node ID.
    pub id: i64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl NodeRecord {
    /// Creates a new NodeRecord.
    pub fn new(id: i64, location: Location) -> Self {
        NodeRecord {
            id,
            lat: location.lat,
            lon: location.lon,
        }
    }

    /// Gets the location of the node.
    pub fn location(&self) -> Location {
        Location::new(self.lon, self.lat)
    }
}

/// The elements matched by one rule in one changeset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleMatches {
    /// Matched ways.
    pub way_ids: BTreeSet<i64>,
    /// Matched nodes.
    pub nodes: BTreeMap<i64, NodeRecord>,
}

impl RuleMatches {
    /// Number of distinct matched elements.
    pub fn count(&self) -> usize {
        self.way_ids.len() + self.nodes.len()
    }

    fn merge(&mut self, other: RuleMatches) {
        self.way_ids.extend(other.way_ids);
        for (id, node) in other.nodes {
            self.nodes.entry(id).or_insert(node);
        }
    }
}

/// All matches of a single changeset, still being accumulated.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangesetRecord {
    /// Changeset ID.
    pub id: i64,
    /// Display name of the editor.
    pub user: String,
    /// Numeric ID of the editor.
    pub uid: i64,
    /// Matched ways, for any rule.
    pub way_ids: BTreeSet<i64>,
    /// Matched nodes, for any rule.
    pub nodes: BTreeMap<i64, NodeRecord>,
    /// Vertices of the matched ways, resolved from the accepted nodes. Sorted and unique, so
    /// repeated matches of a way union their vertices.
    pub way_vertices: BTreeMap<i64, Vec<Location>>,
    /// Matches per rule name.
    pub rules: BTreeMap<String, RuleMatches>,
}

impl ChangesetRecord {
    fn new(element: &RawElement, rule_names: &[String]) -> Self {
        ChangesetRecord {
            id: element.changeset,
            user: element.user.clone(),
            uid: element.uid,
            way_ids: BTreeSet::new(),
            nodes: BTreeMap::new(),
            way_vertices: BTreeMap::new(),
            rules: rule_names
                .iter()
                .map(|name| (name.clone(), RuleMatches::default()))
                .collect(),
        }
    }

    fn get_rule_mut(&mut self, rule_name: &str) -> anyhow::Result<&mut RuleMatches> {
        let id = self.id;
        self.rules
            .get_mut(rule_name)
            .ok_or_else(|| anyhow::anyhow!("changeset {id}: unknown rule '{rule_name}'"))
    }

    fn merge(&mut self, other: ChangesetRecord) {
        self.way_ids.extend(other.way_ids);
        for (id, node) in other.nodes {
            self.nodes.entry(id).or_insert(node);
        }
        for (id, vertices) in other.way_vertices {
            union_vertices(self.way_vertices.entry(id).or_default(), vertices);
        }
        for (name, matches) in other.rules {
            self.rules.entry(name).or_default().merge(matches);
        }
    }
}

fn union_vertices(vertices: &mut Vec<Location>, other: Vec<Location>) {
    vertices.extend(other);
    vertices.sort_by(|a, b| a.lon.total_cmp(&b.lon).then(a.lat.total_cmp(&b.lat)));
    vertices.dedup_by(|a, b| {
        a.lon.to_bits() == b.lon.to_bits() && a.lat.to_bits() == b.lat.to_bits()
    });
}

/// A changeset after all elements are processed: sets are turned into lists and counts.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangesetSummary {
    /// Changeset ID.
    pub id: i64,
    /// Display name of the editor.
    pub user: String,
    /// Numeric ID of the editor.
    pub uid: i64,
    /// Matched node IDs, sorted.
    pub node_ids: Vec<i64>,
    /// Matched way IDs, sorted.
    pub way_ids: Vec<i64>,
    /// Matched nodes, sorted by ID.
    pub nodes: Vec<NodeRecord>,
    /// Number of matched elements per rule name.
    pub counts: BTreeMap<String, usize>,
    /// Sum of the per-rule counts.
    pub total: usize,
    /// Matched node locations and way vertices, to frame the changeset on a map.
    pub points: Vec<Location>,
}

/// Accumulates changeset records during one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Changesets {
    rule_names: Vec<String>,
    records: BTreeMap<i64, ChangesetRecord>,
}

impl Changesets {
    /// Creates an empty accumulator for the given rules.
    pub fn new(rule_names: &[String]) -> Self {
        Changesets {
            rule_names: rule_names.to_vec(),
            records: BTreeMap::new(),
        }
    }

    /// Makes sure there is a record for the changeset of `element`. Does nothing if the record
    /// already exists.
    pub fn add_changeset(&mut self, element: &RawElement) {
        if self.records.contains_key(&element.changeset) {
            return;
        }

        self.records.insert(
            element.changeset,
            ChangesetRecord::new(element, &self.rule_names),
        );
    }

    /// Records a node matched by `rule_name` in changeset `cid`.
    pub fn record_node_match(
        &mut self,
        rule_name: &str,
        cid: i64,
        node: NodeRecord,
    ) -> anyhow::Result<()> {
        let record = self.get_record_mut(cid)?;
        record.nodes.entry(node.id).or_insert(node);
        record.get_rule_mut(rule_name)?.nodes.entry(node.id).or_insert(node);
        Ok(())
    }

    /// Records a way matched by `rule_name` in changeset `cid`, with its resolved vertices.
    pub fn record_way_match(
        &mut self,
        rule_name: &str,
        cid: i64,
        wid: i64,
        vertices: Vec<Location>,
    ) -> anyhow::Result<()> {
        let record = self.get_record_mut(cid)?;
        record.way_ids.insert(wid);
        union_vertices(record.way_vertices.entry(wid).or_default(), vertices);
        record.get_rule_mut(rule_name)?.way_ids.insert(wid);
        Ok(())
    }

    /// Unions `other` into self. The result doesn't depend on the merge order.
    pub fn merge(&mut self, other: Changesets) {
        for (id, record) in other.records {
            match self.records.get_mut(&id) {
                Some(existing) => existing.merge(record),
                None => {
                    self.records.insert(id, record);
                }
            }
        }
    }

    /// Gets the record of changeset `cid`, if any element of it matched.
    pub fn get(&self, cid: i64) -> Option<&ChangesetRecord> {
        self.records.get(&cid)
    }

    /// Number of changesets with at least one match.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Decides if no changeset matched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets the rule names, in config order.
    pub fn get_rule_names(&self) -> &[String] {
        &self.rule_names
    }

    /// Number of distinct changesets per rule name, where the rule matched at least once.
    pub fn get_rule_stats(&self) -> BTreeMap<String, usize> {
        self.rule_names
            .iter()
            .map(|name| {
                let count = self
                    .records
                    .values()
                    .filter(|record| match record.rules.get(name) {
                        Some(matches) => matches.count() > 0,
                        None => false,
                    })
                    .count();
                (name.clone(), count)
            })
            .collect()
    }

    /// Turns the accumulated sets into lists and counts, ordered by changeset ID.
    pub fn finalize(self) -> Vec<ChangesetSummary> {
        let rule_names = self.rule_names;
        self.records
            .into_values()
            .map(|record| {
                let counts: BTreeMap<String, usize> = rule_names
                    .iter()
                    .map(|name| {
                        let count = record.rules.get(name).map(|i| i.count()).unwrap_or(0);
                        (name.clone(), count)
                    })
                    .collect();
                let total = counts.values().sum();
                let mut points: Vec<Location> =
                    record.nodes.values().map(|node| node.location()).collect();
                for vertices in record.way_vertices.values() {
                    points.extend(vertices.iter().cloned());
                }
                ChangesetSummary {
                    id: record.id,
                    user: record.user,
                    uid: record.uid,
                    node_ids: record.nodes.keys().cloned().collect(),
                    way_ids: record.way_ids.into_iter().collect(),
                    nodes: record.nodes.into_values().collect(),
                    counts,
                    total,
                    points,
                }
            })
            .collect()
    }

    fn get_record_mut(&mut self, cid: i64) -> anyhow::Result<&mut ChangesetRecord> {
        self.records
            .get_mut(&cid)
            .ok_or_else(|| anyhow::anyhow!("unknown changeset {cid}"))
    }
}
