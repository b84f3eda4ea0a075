/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! Finds the changesets of an OsmChange feed which touched watched tags inside an area.

pub mod changesets;
pub mod context;
pub mod dispatch;
pub mod element;
pub mod geometry;
pub mod history;
pub mod osc;
pub mod process;
pub mod report;
pub mod serde;
pub mod sql;
pub mod tags;
pub mod viewport;
