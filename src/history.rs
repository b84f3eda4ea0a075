/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The history module decides if the watched tags of an element changed since its previous
//! revision.

use crate::context;
use crate::element::ElementKind;
use crate::element::RawElement;
use crate::sql;
use crate::tags;
use crate::tags::TagMap;
use anyhow::Context as _;
use rusqlite::OptionalExtension as _;
use std::sync::Mutex;

/// Provides the tags of old element revisions.
pub trait HistorySource: Send + Sync {
    /// Gets the tags of `version`, Ok(None) if that revision doesn't exist.
    fn get_history(&self, kind: ElementKind, id: i64, version: u64)
    -> anyhow::Result<Option<TagMap>>;
}

/// The outcome of a single request.
enum Attempt {
    Found(TagMap),
    Absent,
    Retry(anyhow::Error),
}

/// History source backed by the OSM API.
pub struct OsmApiHistory {
    ctx: context::Context,
}

impl OsmApiHistory {
    /// Creates a new OsmApiHistory.
    pub fn new(ctx: &context::Context) -> Self {
        OsmApiHistory { ctx: ctx.clone() }
    }

    fn get_url(&self, kind: ElementKind, id: i64, version: u64) -> String {
        format!(
            "{}/api/0.6/{}/{}/{}.json",
            self.ctx.get_ini().get_history_api_uri(),
            kind.as_str(),
            id,
            version
        )
    }

    fn attempt(&self, url: &str, version: u64) -> Attempt {
        let buf = match self.ctx.get_network().urlopen(url, "") {
            Ok(value) => value,
            Err(err) => {
                return match err.downcast_ref::<context::HttpStatusError>() {
                    // Not found, or deleted and redacted.
                    Some(status) if status.status == 404 || status.status == 410 => {
                        Attempt::Absent
                    }
                    _ => Attempt::Retry(err),
                };
            }
        };

        if buf.trim().is_empty() {
            return Attempt::Absent;
        }

        let result: crate::serde::OsmApiResult = match serde_json::from_str(&buf) {
            Ok(value) => value,
            Err(err) => {
                return Attempt::Retry(anyhow::Error::new(err).context("failed to parse response"));
            }
        };
        match result.elements.into_iter().find(|i| i.version == version) {
            Some(element) => Attempt::Found(element.tags),
            None => Attempt::Absent,
        }
    }
}

impl HistorySource for OsmApiHistory {
    fn get_history(
        &self,
        kind: ElementKind,
        id: i64,
        version: u64,
    ) -> anyhow::Result<Option<TagMap>> {
        let url = self.get_url(kind, id, version);
        let retries = self.ctx.get_ini().get_history_retries();
        let mut retry: u32 = 0;
        loop {
            match self.attempt(&url, version) {
                Attempt::Found(tags) => return Ok(Some(tags)),
                Attempt::Absent => return Ok(None),
                Attempt::Retry(err) => {
                    if retry >= retries {
                        return Err(err.context(format!(
                            "giving up on '{}' after {} attempts",
                            url,
                            retry + 1
                        )));
                    }
                    retry += 1;
                    let sleep = self.ctx.get_ini().get_history_retry_sleep() * retry as u64;
                    log::info!(
                        "get_history: try #{} for '{}' in {} seconds: {:?}",
                        retry,
                        url,
                        sleep,
                        err
                    );
                    self.ctx.get_time().sleep(sleep);
                }
            }
        }
    }
}

/// History source that remembers snapshots of an other source in the database.
pub struct CachedHistory {
    inner: Box<dyn HistorySource>,
    conn: Mutex<rusqlite::Connection>,
}

impl CachedHistory {
    /// Creates a new CachedHistory.
    pub fn new(inner: Box<dyn HistorySource>, conn: rusqlite::Connection) -> Self {
        CachedHistory {
            inner,
            conn: Mutex::new(conn),
        }
    }

    fn lookup(&self, kind: ElementKind, id: i64, version: u64) -> anyhow::Result<Option<TagMap>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("history cache lock is poisoned"))?;
        let json: Option<String> = conn
            .query_row(
                "select tags from history_snapshots where kind = ?1 and id = ?2 and version = ?3",
                rusqlite::params![kind.as_str(), id, version as i64],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn store(&self, kind: ElementKind, id: i64, version: u64, tags: &TagMap) -> anyhow::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("history cache lock is poisoned"))?;
        sql::ignore_primary_key_constraint(conn.execute(
            "insert into history_snapshots (kind, id, version, tags) values (?1, ?2, ?3, ?4)",
            rusqlite::params![kind.as_str(), id, version as i64, serde_json::to_string(tags)?],
        ))?;
        Ok(())
    }
}

impl HistorySource for CachedHistory {
    fn get_history(
        &self,
        kind: ElementKind,
        id: i64,
        version: u64,
    ) -> anyhow::Result<Option<TagMap>> {
        if let Some(tags) = self
            .lookup(kind, id, version)
            .context("history cache lookup failed")?
        {
            return Ok(Some(tags));
        }

        // Only found snapshots are cached, absent ones may show up later.
        let ret = self.inner.get_history(kind, id, version)?;
        if let Some(ref tags) = ret {
            self.store(kind, id, version, tags)
                .context("history cache store failed")?;
        }
        Ok(ret)
    }
}

/// Creates the configured history source.
pub fn make_history_source(ctx: &context::Context) -> anyhow::Result<Box<dyn HistorySource>> {
    let api_uri = ctx.get_ini().get_history_api_uri();
    let url = url::Url::parse(&api_uri).with_context(|| format!("invalid api_uri '{api_uri}'"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow::anyhow!("unsupported scheme in api_uri '{api_uri}'"));
    }

    let api: Box<dyn HistorySource> = Box::new(OsmApiHistory::new(ctx));
    if !ctx.get_ini().get_history_cache() {
        return Ok(api);
    }

    let conn = ctx.get_database_connection()?;
    Ok(Box::new(CachedHistory::new(api, conn)))
}

/// Decides if the tags matching `key` changed since the previous revision of `element`. New and
/// deleted elements always count as changed. A failed lookup counts as unchanged.
pub fn has_tag_changed(
    source: &dyn HistorySource,
    element: &RawElement,
    key: &regex::Regex,
) -> bool {
    if element.deleted || element.version <= 1 {
        return true;
    }

    let kind = element.kind();
    let previous = match source.get_history(kind, element.id, element.version - 1) {
        Ok(Some(value)) => value,
        Ok(None) => {
            log::debug!(
                "has_tag_changed: no {} {} v{}",
                kind.as_str(),
                element.id,
                element.version - 1
            );
            return false;
        }
        Err(err) => {
            log::warn!(
                "has_tag_changed: failed to get {} {} v{}, assuming no change: {:?}",
                kind.as_str(),
                element.id,
                element.version - 1,
                err
            );
            return false;
        }
    };

    let previous = tags::extract_matching_tags(&previous, key);
    let current = tags::extract_matching_tags(element.tags.iter().map(|(k, v)| (k, v)), key);
    previous != current
}

#[cfg(test)]
mod tests;
