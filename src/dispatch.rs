/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The dispatch module fans out a workload to a pool of workers, each with a private
//! accumulator, then merges the partial results.

use crate::changesets::Changesets;
use anyhow::Context as _;
use rayon::iter::IntoParallelIterator as _;
use rayon::iter::ParallelIterator as _;

/// Resolves the configured worker count, 0 means one worker per available CPU.
pub fn get_worker_count(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }

    match std::thread::available_parallelism() {
        Ok(value) => value.get(),
        Err(_) => 1,
    }
}

/// Splits `items` into at most `shards` disjoint, contiguous, non-empty parts.
pub fn partition<T>(items: &[T], shards: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }

    let shards = shards.clamp(1, items.len());
    let chunk_size = items.len().div_ceil(shards);
    items.chunks(chunk_size).collect()
}

/// Gets a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".into()
}

/// Runs `work` on each item of one shard, into a fresh accumulator. A panic is turned into an
/// error.
fn run_shard<T, F>(shard: &[T], rule_names: &[String], work: &F) -> anyhow::Result<Changesets>
where
    F: Fn(&T, &mut Changesets) -> anyhow::Result<()>,
{
    let ret = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut partial = Changesets::new(rule_names);
        for item in shard {
            work(item, &mut partial)?;
        }
        Ok(partial)
    }));
    match ret {
        Ok(value) => value,
        Err(payload) => Err(anyhow::anyhow!(
            "worker panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

/// Processes `items` with `workers` parallel workers. Each worker owns a private accumulator,
/// these are merged in shard order once all workers are done. Any worker failure fails the whole
/// batch.
pub fn dispatch<T, F>(
    items: &[T],
    workers: usize,
    rule_names: &[String],
    work: F,
) -> anyhow::Result<Changesets>
where
    T: Sync,
    F: Fn(&T, &mut Changesets) -> anyhow::Result<()> + Sync,
{
    let shards = partition(items, workers);
    let mut merged = Changesets::new(rule_names);
    if shards.is_empty() {
        return Ok(merged);
    }

    log::info!(
        "dispatch: {} items in {} shards on {} workers",
        items.len(),
        shards.len(),
        workers
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("failed to create the worker pool")?;
    let results: Vec<anyhow::Result<Changesets>> = pool.install(|| {
        shards
            .into_par_iter()
            .map(|shard| run_shard(shard, rule_names, &work))
            .collect()
    });

    for (index, result) in results.into_iter().enumerate() {
        let partial = result.with_context(|| format!("shard #{index} failed"))?;
        merged.merge(partial);
    }
    Ok(merged)
}
