/*
 * Copyright 2022 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Tests for the report module.

use super::*;
use crate::element::tests::make_node;
use std::sync::Arc;

fn make_rule_names() -> Vec<String> {
    vec!["amenity".to_string(), "building".to_string()]
}

/// Creates an accumulator with one matched node in each of `count` changesets.
fn make_changesets(count: i64) -> Changesets {
    let mut changesets = Changesets::new(&make_rule_names());
    for cid in 1..=count {
        let mut node = make_node(cid, 1, &[("amenity", "cafe")], 2.81372, 41.98268);
        node.changeset = cid;
        changesets.add_changeset(&node);
        changesets
            .record_node_match("amenity", cid, NodeRecord::new(cid, node.location().unwrap()))
            .unwrap();
    }
    changesets
}

/// Tests make_report().
#[test]
fn test_make_report() {
    let ctx = context::tests::make_test_context().unwrap();

    let report = make_report(&ctx, make_changesets(2)).unwrap();

    assert_eq!(report.date, "May 10, 2020");
    assert_eq!(report.rules, vec!["amenity", "building"]);
    assert_eq!(report.stats.total, 2);
    assert_eq!(report.stats.rules["amenity"], 2);
    assert_eq!(report.stats.rules["building"], 0);
    assert_eq!(report.stats.limit_exceed, None);
    assert_eq!(report.changesets.len(), 2);
    let changeset = &report.changesets[0];
    assert_eq!(changeset.node_ids, vec![1]);
    assert_eq!(changeset.total, 1);
    let viewport = changeset.viewport.unwrap();
    assert_eq!(viewport.zoom, 18);
    assert_eq!(
        changeset.map_link.as_deref(),
        Some("https://www.openstreetmap.org/?lat=41.98268&lon=2.81372&zoom=18&layers=M")
    );
}

/// Tests make_report(): too many changesets are truncated, but the stats see all of them.
#[test]
fn test_make_report_limit() {
    let ctx = context::tests::make_test_context().unwrap();

    let report = make_report(&ctx, make_changesets(1002)).unwrap();

    assert_eq!(report.changesets.len(), CHANGESET_LIMIT);
    assert_eq!(report.changesets.last().unwrap().id, 1000);
    assert_eq!(report.stats.total, 1002);
    assert_eq!(report.stats.rules["amenity"], 1002);
    assert_eq!(report.stats.limit_exceed.as_deref(), Some(LIMIT_NOTE));
}

/// Tests make_report(): exactly at the limit, nothing is truncated.
#[test]
fn test_make_report_at_limit() {
    let ctx = context::tests::make_test_context().unwrap();

    let report = make_report(&ctx, make_changesets(1000)).unwrap();

    assert_eq!(report.changesets.len(), 1000);
    assert_eq!(report.stats.limit_exceed, None);
}

/// Tests the JSON form of Stats.
#[test]
fn test_stats_json() {
    let mut stats = Stats {
        rules: BTreeMap::from([("amenity".to_string(), 3)]),
        total: 4,
        limit_exceed: None,
    };

    assert_eq!(
        serde_json::to_value(&stats).unwrap(),
        serde_json::json!({"amenity": 3, "total": 4})
    );

    stats.limit_exceed = Some(LIMIT_NOTE.into());
    let value = serde_json::to_value(&stats).unwrap();
    assert_eq!(value["limit_exceed"], LIMIT_NOTE);
}

/// Tests write_report(): the default path contains the date.
#[test]
fn test_write_report_default_path() {
    let mut ctx = context::tests::make_test_context().unwrap();
    let file_system = context::tests::TestFileSystem::new();
    let files = file_system.get_files();
    let file_system_arc: Arc<dyn context::FileSystem> = Arc::new(file_system);
    ctx.set_file_system(&file_system_arc);
    let report = make_report(&ctx, make_changesets(1)).unwrap();

    let path = write_report(&ctx, &report).unwrap();

    assert_eq!(
        path,
        ctx.get_abspath("workdir/osm_change_report_05-10-20.json")
    );
    let files = files.lock().unwrap();
    let value: serde_json::Value = serde_json::from_str(&files[&path]).unwrap();
    assert_eq!(value["date"], "May 10, 2020");
    assert_eq!(value["stats"]["total"], 1);
    assert_eq!(value["changesets"][0]["user"], "alice");
    assert_eq!(value["changesets"][0]["viewport"]["zoom"], 18);
}

/// Tests write_report(): the configured path is used.
#[test]
fn test_write_report_configured_path() {
    let mut ctx = context::tests::make_test_context().unwrap();
    let file_system = context::tests::TestFileSystem::new();
    let files = file_system.get_files();
    let file_system_arc: Arc<dyn context::FileSystem> = Arc::new(file_system);
    ctx.set_file_system(&file_system_arc);
    let ini = context::Ini::from_toml("[report]\noutput = \"out/report.json\"\n", "/data").unwrap();
    ctx.set_ini(ini);
    let report = make_report(&ctx, make_changesets(0)).unwrap();

    let path = write_report(&ctx, &report).unwrap();

    assert_eq!(path, "/data/out/report.json");
    assert_eq!(files.lock().unwrap().contains_key("/data/out/report.json"), true);
}
