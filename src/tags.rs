/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The tags module decides if an element carries a watched tag.

use crate::context;
use crate::element::ElementKind;
use crate::element::RawElement;
use anyhow::Context as _;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Tags selected by a key pattern, comparable between revisions.
pub type TagMap = BTreeMap<String, String>;

/// Compiles a pattern which only has to match at the start of the input, not the whole input.
fn compile_prefix_regex(pattern: &str) -> anyhow::Result<regex::Regex> {
    regex::Regex::new(&format!("^(?:{pattern})"))
        .with_context(|| format!("invalid pattern '{pattern}'"))
}

/// A named key / value pattern pair, defining what is interesting.
#[derive(Clone, Debug)]
pub struct WatchRule {
    name: String,
    key: regex::Regex,
    value: Option<regex::Regex>,
    kinds: BTreeSet<ElementKind>,
}

impl WatchRule {
    /// Creates a new rule. No value pattern means any value.
    pub fn new(
        name: &str,
        key: &str,
        value: Option<&str>,
        kinds: &[ElementKind],
    ) -> anyhow::Result<Self> {
        let value = match value {
            Some(value) => Some(compile_prefix_regex(value)?),
            None => None,
        };
        Ok(WatchRule {
            name: name.into(),
            key: compile_prefix_regex(key)?,
            value,
            kinds: kinds.iter().cloned().collect(),
        })
    }

    /// Creates a new rule from its config. No types means all kinds.
    pub fn from_config(config: &crate::serde::RuleConfig) -> anyhow::Result<Self> {
        let kinds: Vec<ElementKind> = match config.types {
            Some(ref types) => types
                .iter()
                .map(|i| i.parse::<ElementKind>())
                .collect::<anyhow::Result<_>>()?,
            None => vec![ElementKind::Node, ElementKind::Way, ElementKind::Relation],
        };
        WatchRule::new(&config.name, &config.key, config.value.as_deref(), &kinds)
            .with_context(|| format!("invalid rule '{}'", config.name))
    }

    /// Gets the unique name of the rule.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Gets the key pattern.
    pub fn get_key(&self) -> &regex::Regex {
        &self.key
    }

    /// Decides if the rule is evaluated for elements of `kind`.
    pub fn applies_to(&self, kind: ElementKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Loads the configured rules, in config order.
pub fn load_rules(ctx: &context::Context) -> anyhow::Result<Vec<WatchRule>> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut rules = Vec::new();
    for config in ctx.get_ini().get_rules() {
        if crate::report::RESERVED_STATS.contains(&config.name.as_str()) {
            return Err(anyhow::anyhow!("reserved rule name '{}'", config.name));
        }
        if !names.insert(&config.name) {
            return Err(anyhow::anyhow!("duplicate rule name '{}'", config.name));
        }
        rules.push(WatchRule::from_config(config)?);
    }
    Ok(rules)
}

/// Decides if any tag of `element` matches `rule`. Stops at the first match.
pub fn has_watched_tag(element: &RawElement, rule: &WatchRule) -> bool {
    element.tags.iter().any(|(key, value)| {
        rule.key.is_match(key)
            && match rule.value {
                Some(ref value_re) => value_re.is_match(value),
                None => true,
            }
    })
}

/// Collects the tags whose key matches `key`, regardless of their value.
pub fn extract_matching_tags<'a, I>(tags: I, key: &regex::Regex) -> TagMap
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    tags.into_iter()
        .filter(|(k, _v)| key.is_match(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
