/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The osc module reads OsmChange documents.

use crate::element::ElementData;
use crate::element::ElementKind;
use crate::element::Member;
use crate::element::RawElement;
use crate::geometry::Location;
use anyhow::Context as _;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

type Attributes = HashMap<String, String>;

fn get_attributes(element: &BytesStart<'_>) -> anyhow::Result<Attributes> {
    let mut ret = HashMap::new();
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        ret.insert(key, value);
    }
    Ok(ret)
}

/// Parses an optional attribute, a present but invalid value is an error.
fn parse_attribute<T>(attributes: &Attributes, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match attributes.get(name) {
        Some(value) => Ok(Some(value.parse::<T>().with_context(|| {
            format!("invalid value for '{name}': '{value}'")
        })?)),
        None => Ok(None),
    }
}

fn get_attribute<'a>(attributes: &'a Attributes, name: &str) -> anyhow::Result<&'a String> {
    attributes
        .get(name)
        .with_context(|| format!("missing attribute '{name}'"))
}

/// Creates an element without tags or children from the attributes of its XML element.
fn parse_element(
    kind: ElementKind,
    attributes: &Attributes,
    in_delete: bool,
) -> anyhow::Result<RawElement> {
    let id: i64 = parse_attribute(attributes, "id")?.context("missing attribute 'id'")?;
    let visible = attributes.get("visible").map(|i| i.as_str()) != Some("false");
    let data = match kind {
        ElementKind::Node => {
            // Deleted nodes typically have no coordinates.
            let lat = attributes.get("lat").and_then(|i| i.parse::<f64>().ok());
            let lon = attributes.get("lon").and_then(|i| i.parse::<f64>().ok());
            let location = match (lon, lat) {
                (Some(lon), Some(lat)) => Some(Location::new(lon, lat)),
                _ => None,
            };
            ElementData::Node(location)
        }
        ElementKind::Way => ElementData::Way(Vec::new()),
        ElementKind::Relation => ElementData::Relation(Vec::new()),
    };
    Ok(RawElement {
        id,
        version: parse_attribute(attributes, "version")?.unwrap_or(1),
        changeset: parse_attribute(attributes, "changeset")?.unwrap_or(0),
        user: attributes.get("user").cloned().unwrap_or_default(),
        uid: parse_attribute(attributes, "uid")?.unwrap_or(0),
        deleted: in_delete || !visible,
        tags: Vec::new(),
        data,
    })
}

/// Adds a <tag>, <nd> or <member> child to `element`.
fn add_child(element: &mut RawElement, name: &[u8], attributes: &Attributes) -> anyhow::Result<()> {
    match name {
        b"tag" => {
            let key = get_attribute(attributes, "k")?;
            let value = get_attribute(attributes, "v")?;
            element.tags.push((key.clone(), value.clone()));
        }
        b"nd" => {
            let node_id: i64 =
                parse_attribute(attributes, "ref")?.context("missing attribute 'ref'")?;
            if let ElementData::Way(ref mut node_ids) = element.data {
                node_ids.push(node_id);
            }
        }
        b"member" => {
            let kind: ElementKind = get_attribute(attributes, "type")?.parse()?;
            let id: i64 = parse_attribute(attributes, "ref")?.context("missing attribute 'ref'")?;
            let role = attributes.get("role").cloned().unwrap_or_default();
            if let ElementData::Relation(ref mut members) = element.data {
                members.push(Member { kind, id, role });
            }
        }
        _ => (),
    }
    Ok(())
}

fn get_element_kind(name: &[u8]) -> Option<ElementKind> {
    match name {
        b"node" => Some(ElementKind::Node),
        b"way" => Some(ElementKind::Way),
        b"relation" => Some(ElementKind::Relation),
        _ => None,
    }
}

/// Parses an OsmChange document, the elements are returned in document order.
pub fn read_osc(xml: &str) -> anyhow::Result<Vec<RawElement>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut elements: Vec<RawElement> = Vec::new();
    let mut current: Option<RawElement> = None;
    let mut in_delete = false;
    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("failed to parse XML at {}", reader.buffer_position()))?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                if name.as_ref() == b"delete" {
                    in_delete = !is_empty;
                    continue;
                }

                let attributes = get_attributes(e)?;
                match get_element_kind(name.as_ref()) {
                    Some(kind) => {
                        let element = parse_element(kind, &attributes, in_delete)
                            .with_context(|| format!("failed to parse a <{}>", kind.as_str()))?;
                        if is_empty {
                            elements.push(element);
                        } else {
                            current = Some(element);
                        }
                    }
                    None => {
                        if let Some(ref mut element) = current {
                            add_child(element, name.as_ref(), &attributes).with_context(|| {
                                format!(
                                    "failed to parse a child of {} {}",
                                    element.kind().as_str(),
                                    element.id
                                )
                            })?;
                        }
                    }
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                if name.as_ref() == b"delete" {
                    in_delete = false;
                } else if get_element_kind(name.as_ref()).is_some() {
                    if let Some(element) = current.take() {
                        elements.push(element);
                    }
                }
            }
            _ => (),
        }
    }
    Ok(elements)
}
