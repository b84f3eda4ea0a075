/*
 * Copyright 2022 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! Tests for the history module.

use super::*;
use crate::element::tests::make_node;
use std::sync::Arc;

/// Sets up `routes` as the network of `ctx`, returns a handle to inspect the requests later.
fn set_routes(
    ctx: &mut context::Context,
    routes: &[context::tests::URLRoute],
) -> Arc<context::tests::TestNetwork> {
    let network = Arc::new(context::tests::TestNetwork::new(routes));
    let network_arc: Arc<dyn context::Network> = network.clone();
    ctx.set_network(network_arc);
    network
}

/// Creates a test context with one retry and no cache.
fn make_context() -> context::Context {
    let mut ctx = context::tests::make_test_context().unwrap();
    let ini = context::Ini::from_toml("[history]\nretries = 1\ncache = false\n", "").unwrap();
    ctx.set_ini(ini);
    ctx
}

fn make_key(pattern: &str) -> regex::Regex {
    regex::Regex::new(&format!("^(?:{pattern})")).unwrap()
}

/// Tests has_tag_changed(): the first version needs no lookup.
#[test]
fn test_has_tag_changed_new() {
    let mut ctx = make_context();
    let network = set_routes(&mut ctx, &[]);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(42, 1, &[("amenity", "cafe")], 2.81372, 41.98268);

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), true);
    assert_eq!(network.get_requests().is_empty(), true);
}

/// Tests has_tag_changed(): deletions need no lookup.
#[test]
fn test_has_tag_changed_deleted() {
    let mut ctx = make_context();
    let network = set_routes(&mut ctx, &[]);
    let source = OsmApiHistory::new(&ctx);
    let mut node = make_node(42, 5, &[], 2.81372, 41.98268);
    node.deleted = true;

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), true);
    assert_eq!(network.get_requests().is_empty(), true);
}

/// Tests has_tag_changed(): the value of a watched tag changed.
#[test]
fn test_has_tag_changed_value() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/node-42-1.json",
    )];
    let network = set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(
        42,
        2,
        &[("amenity", "restaurant"), ("name", "Cafe Girona")],
        2.81372,
        41.98268,
    );

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), true);
    assert_eq!(
        network.get_requests(),
        vec!["https://api.openstreetmap.org/api/0.6/node/42/1.json"]
    );
}

/// Tests has_tag_changed(): only a non-watched tag changed.
#[test]
fn test_has_tag_changed_other_key() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/node-42-1.json",
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(
        42,
        2,
        &[("amenity", "cafe"), ("name", "Cafe Nou")],
        2.81372,
        41.98268,
    );

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), false);
}

/// Tests has_tag_changed(): the watched tag is added to a previously untagged node.
#[test]
fn test_has_tag_changed_added() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/node/43/1.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/node-43-1.json",
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(43, 2, &[("amenity", "bench")], 2.811, 41.98001);

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), true);
}

/// Tests has_tag_changed(): the previous version is not found.
#[test]
fn test_has_tag_changed_not_found() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::with_status(
        "https://api.openstreetmap.org/api/0.6/node/42/1.json",
        404,
    )];
    let network = set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(42, 2, &[("amenity", "restaurant")], 2.81372, 41.98268);

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), false);
    // No retry for a missing revision.
    assert_eq!(network.get_requests().len(), 1);
}

/// Tests OsmApiHistory::get_history(): a redacted revision is absent.
#[test]
fn test_get_history_gone() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::with_status(
        "https://api.openstreetmap.org/api/0.6/way/7/2.json",
        410,
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Way, 7, 2).unwrap();

    assert_eq!(ret, None);
}

/// Tests OsmApiHistory::get_history(): an empty response is absent.
#[test]
fn test_get_history_empty() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/way/7/2.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/empty.json",
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Way, 7, 2).unwrap();

    assert_eq!(ret, None);
}

/// Tests OsmApiHistory::get_history(): the response has no matching version.
#[test]
fn test_get_history_version_mismatch() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/way/7/3.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/way-7-2.json",
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Way, 7, 3).unwrap();

    assert_eq!(ret, None);
}

/// Tests OsmApiHistory::get_history(): the configured API URI is used.
#[test]
fn test_get_history_api_uri() {
    let mut ctx = make_context();
    let ini = context::Ini::from_toml("[history]\napi_uri = \"https://osm.example.com\"\n", "")
        .unwrap();
    ctx.set_ini(ini);
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://osm.example.com/api/0.6/way/7/2.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/way-7-2.json",
    )];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Way, 7, 2).unwrap().unwrap();

    assert_eq!(ret["building"], "yes");
}

/// Tests OsmApiHistory::get_history(): a server error is retried.
#[test]
fn test_get_history_retry() {
    let mut ctx = make_context();
    let routes = vec![
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            503,
        ),
        context::tests::URLRoute::new(
            /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            /*data_path=*/ "",
            /*result_path=*/ "src/fixtures/network/node-42-1.json",
        ),
    ];
    let network = set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Node, 42, 1).unwrap().unwrap();

    assert_eq!(ret["amenity"], "cafe");
    assert_eq!(network.get_requests().len(), 2);
    let time = ctx
        .get_time()
        .as_any()
        .downcast_ref::<context::tests::TestTime>()
        .unwrap();
    assert_eq!(time.get_sleeps(), vec![1]);
}

/// Tests OsmApiHistory::get_history(): a broken response is retried as well.
#[test]
fn test_get_history_retry_parse_error() {
    let mut ctx = make_context();
    let routes = vec![
        context::tests::URLRoute::new(
            /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            /*data_path=*/ "",
            /*result_path=*/ "src/fixtures/network/broken.json",
        ),
        context::tests::URLRoute::new(
            /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            /*data_path=*/ "",
            /*result_path=*/ "src/fixtures/network/node-42-1.json",
        ),
    ];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Node, 42, 1).unwrap();

    assert_eq!(ret.is_some(), true);
}

/// Tests OsmApiHistory::get_history(): the retries are exhausted.
#[test]
fn test_get_history_give_up() {
    let mut ctx = make_context();
    let routes = vec![
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            503,
        ),
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            503,
        ),
    ];
    let network = set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);

    let ret = source.get_history(ElementKind::Node, 42, 1);

    assert_eq!(ret.is_err(), true);
    assert_eq!(network.get_requests().len(), 2);
}

/// Tests has_tag_changed(): a failed lookup counts as unchanged.
#[test]
fn test_has_tag_changed_give_up() {
    let mut ctx = make_context();
    let routes = vec![
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            500,
        ),
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            502,
        ),
    ];
    set_routes(&mut ctx, &routes);
    let source = OsmApiHistory::new(&ctx);
    let node = make_node(42, 2, &[("amenity", "restaurant")], 2.81372, 41.98268);

    assert_eq!(has_tag_changed(&source, &node, &make_key("amenity")), false);
}

/// Tests CachedHistory: the second lookup is served from the database.
#[test]
fn test_cached_history() {
    let mut ctx = make_context();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/node/42/1.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/node-42-1.json",
    )];
    let network = set_routes(&mut ctx, &routes);
    let conn = ctx.get_database_connection().unwrap();
    let source = CachedHistory::new(Box::new(OsmApiHistory::new(&ctx)), conn);

    let first = source.get_history(ElementKind::Node, 42, 1).unwrap();
    let second = source.get_history(ElementKind::Node, 42, 1).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.unwrap()["name"], "Cafe Girona");
    assert_eq!(network.get_requests().len(), 1);
}

/// Tests CachedHistory: absent revisions are not cached.
#[test]
fn test_cached_history_absent() {
    let mut ctx = make_context();
    let routes = vec![
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            404,
        ),
        context::tests::URLRoute::with_status(
            "https://api.openstreetmap.org/api/0.6/node/42/1.json",
            404,
        ),
    ];
    let network = set_routes(&mut ctx, &routes);
    let conn = ctx.get_database_connection().unwrap();
    let source = CachedHistory::new(Box::new(OsmApiHistory::new(&ctx)), conn);

    assert_eq!(source.get_history(ElementKind::Node, 42, 1).unwrap(), None);
    assert_eq!(source.get_history(ElementKind::Node, 42, 1).unwrap(), None);
    assert_eq!(network.get_requests().len(), 2);
}

/// Tests make_history_source(): the default config caches.
#[test]
fn test_make_history_source() {
    let mut ctx = context::tests::make_test_context().unwrap();
    let routes = vec![context::tests::URLRoute::new(
        /*url=*/ "https://api.openstreetmap.org/api/0.6/way/7/2.json",
        /*data_path=*/ "",
        /*result_path=*/ "src/fixtures/network/way-7-2.json",
    )];
    let network = set_routes(&mut ctx, &routes);

    let source = make_history_source(&ctx).unwrap();
    source.get_history(ElementKind::Way, 7, 2).unwrap();
    source.get_history(ElementKind::Way, 7, 2).unwrap();

    assert_eq!(network.get_requests().len(), 1);
}

/// Tests make_history_source(): the API URI has to be a HTTP URL.
#[test]
fn test_make_history_source_invalid_uri() {
    let mut ctx = context::tests::make_test_context().unwrap();

    ctx.set_ini(context::Ini::from_toml("[history]\napi_uri = \"not a url\"\n", "").unwrap());
    assert_eq!(make_history_source(&ctx).is_err(), true);

    let ini = context::Ini::from_toml("[history]\napi_uri = \"ftp://example.com\"\n", "").unwrap();
    ctx.set_ini(ini);
    assert_eq!(make_history_source(&ctx).is_err(), true);
}
