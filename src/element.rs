/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The element module contains the OSM objects of a change feed.

use crate::geometry::Location;

/// The type of an OSM object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of members.
    Relation,
}

impl ElementKind {
    /// The name used by the OSM API and XML formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl std::str::FromStr for ElementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(ElementKind::Node),
            "way" => Ok(ElementKind::Way),
            "relation" => Ok(ElementKind::Relation),
            _ => Err(anyhow::anyhow!("unknown element kind '{}'", s)),
        }
    }
}

/// One member of a relation.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// The type of the member.
    pub kind: ElementKind,
    /// The ID of the member.
    pub id: i64,
    /// The role of the member, may be empty.
    pub role: String,
}

/// The type specific part of an element.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementData {
    /// Node: absent when the feed has no usable coordinates.
    Node(Option<Location>),
    /// Way: referenced node IDs.
    Way(Vec<i64>),
    /// Relation: members.
    Relation(Vec<Member>),
}

/// One created, modified or deleted object from the change feed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawElement {
    /// Object ID, unique per kind.
    pub id: i64,
    /// Revision, starting at 1.
    pub version: u64,
    /// The changeset which produced this revision.
    pub changeset: i64,
    /// Display name of the editor.
    pub user: String,
    /// Numeric ID of the editor.
    pub uid: i64,
    /// The revision removes the object.
    pub deleted: bool,
    /// Key-value pairs, keys are unique.
    pub tags: Vec<(String, String)>,
    /// Kind specific data.
    pub data: ElementData,
}

impl RawElement {
    /// Gets the kind of the element.
    pub fn kind(&self) -> ElementKind {
        match self.data {
            ElementData::Node(_) => ElementKind::Node,
            ElementData::Way(_) => ElementKind::Way,
            ElementData::Relation(_) => ElementKind::Relation,
        }
    }

    /// Gets the location of a node, None for other kinds.
    pub fn location(&self) -> Option<Location> {
        match self.data {
            ElementData::Node(location) => location,
            _ => None,
        }
    }

    /// Gets the referenced nodes of a way, empty for other kinds.
    pub fn node_ids(&self) -> &[i64] {
        match &self.data {
            ElementData::Way(node_ids) => node_ids,
            _ => &[],
        }
    }
}
