/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The geometry module decides if a location is inside the area of interest.

use crate::context;
use anyhow::Context as _;

/// A WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Location {
    /// Longitude, x.
    pub lon: f64,
    /// Latitude, y.
    pub lat: f64,
}

impl Location {
    /// Creates a new Location.
    pub fn new(lon: f64, lat: f64) -> Self {
        Location { lon, lat }
    }

    /// Decides if the coordinates are usable at all.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct BoundingBox {
    /// West.
    pub min_lon: f64,
    /// South.
    pub min_lat: f64,
    /// East.
    pub max_lon: f64,
    /// North.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a box from its north, east, south and west edges.
    pub fn from_north_east_south_west(north: f64, east: f64, south: f64, west: f64) -> Self {
        BoundingBox {
            min_lon: west,
            min_lat: south,
            max_lon: east,
            max_lat: north,
        }
    }

    /// Returns [min_lon, min_lat, max_lon, max_lat].
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Width in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// Strict interior test: points on the edge of the box are outside.
pub fn in_bounding_box(lon: f64, lat: f64, bbox: &BoundingBox) -> bool {
    bbox.min_lat < lat && lat < bbox.max_lat && bbox.min_lon < lon && lon < bbox.max_lon
}

/// Even-odd ray casting: a horizontal ray from the point is tested against each edge.
pub fn in_polygon(lon: f64, lat: f64, polygon: &[Location]) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];
    for current in polygon {
        if (current.lat > lat) != (previous.lat > lat) {
            let intersect_lon = (previous.lon - current.lon) * (lat - current.lat)
                / (previous.lat - current.lat)
                + current.lon;
            if lon < intersect_lon {
                inside = !inside;
            }
        }
        previous = *current;
    }
    inside
}

/// Finds the smallest box containing all points, None for no points.
pub fn compute_bounding_box(points: &[Location]) -> Option<BoundingBox> {
    let (first, rest) = points.split_first()?;
    let mut bbox = BoundingBox {
        min_lon: first.lon,
        min_lat: first.lat,
        max_lon: first.lon,
        max_lat: first.lat,
    };
    for point in rest {
        bbox.min_lon = bbox.min_lon.min(point.lon);
        bbox.min_lat = bbox.min_lat.min(point.lat);
        bbox.max_lon = bbox.max_lon.max(point.lon);
        bbox.max_lat = bbox.max_lat.max(point.lat);
    }
    Some(bbox)
}

/// Decides if any of the way's node locations is inside `bbox`. Absent or invalid locations are
/// skipped.
pub fn way_in_bounding_box<I>(locations: I, bbox: &BoundingBox) -> bool
where
    I: IntoIterator<Item = Option<Location>>,
{
    locations
        .into_iter()
        .flatten()
        .filter(|location| location.is_valid())
        .any(|location| in_bounding_box(location.lon, location.lat, bbox))
}

/// The region that gates relevance: a polygon and its bounding box.
#[derive(Clone, Debug)]
pub struct AreaOfInterest {
    polygon: Vec<Location>,
    bbox: BoundingBox,
}

impl AreaOfInterest {
    /// Creates an area from the vertices of its outer ring.
    pub fn new(polygon: Vec<Location>) -> anyhow::Result<Self> {
        if polygon.len() < 3 {
            return Err(anyhow::anyhow!(
                "area polygon needs at least 3 vertices, got {}",
                polygon.len()
            ));
        }
        if let Some(invalid) = polygon.iter().find(|i| !i.is_valid()) {
            return Err(anyhow::anyhow!("invalid area vertex: {:?}", invalid));
        }
        let bbox = compute_bounding_box(&polygon).context("empty polygon")?;
        Ok(AreaOfInterest { polygon, bbox })
    }

    /// Creates a rectangular area from its north, east, south and west edges.
    pub fn from_bbox(north: f64, east: f64, south: f64, west: f64) -> anyhow::Result<Self> {
        AreaOfInterest::new(vec![
            Location::new(west, south),
            Location::new(east, south),
            Location::new(east, north),
            Location::new(west, north),
        ])
    }

    /// Creates an area from a GeoJSON Feature, FeatureCollection, Polygon or MultiPolygon. The
    /// outer ring of the first polygon is used.
    pub fn from_geojson(data: &str) -> anyhow::Result<Self> {
        let geojson: geojson::GeoJson = data.parse().context("failed to parse GeoJSON")?;
        let ring = find_outer_ring(&geojson).context("no polygon in GeoJSON")?;
        let mut polygon: Vec<Location> = Vec::new();
        for position in ring {
            match position.as_slice() {
                [lon, lat, ..] => polygon.push(Location::new(*lon, *lat)),
                _ => return Err(anyhow::anyhow!("position is too short: {:?}", position)),
            }
        }
        AreaOfInterest::new(polygon)
    }

    /// Loads the configured area: a GeoJSON file if set, a bbox otherwise.
    pub fn from_config(ctx: &context::Context) -> anyhow::Result<Self> {
        if let Some(path) = ctx.get_ini().get_area_geojson_path() {
            let data = ctx.get_file_system().read_to_string(&path)?;
            return AreaOfInterest::from_geojson(&data)
                .with_context(|| format!("failed to load area from '{path}'"));
        }

        if let Some([north, east, south, west]) = ctx.get_ini().get_area_bbox() {
            return AreaOfInterest::from_bbox(north, east, south, west);
        }

        Err(anyhow::anyhow!("no area of interest is configured"))
    }

    /// Gets the bounding box.
    pub fn get_bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Gets the polygon vertices.
    pub fn get_polygon(&self) -> &[Location] {
        &self.polygon
    }

    /// Decides if a node location is inside: the bbox pre-check first, then the polygon.
    pub fn contains(&self, location: Option<Location>) -> bool {
        let location = match location {
            Some(value) if value.is_valid() => value,
            _ => return false,
        };

        in_bounding_box(location.lon, location.lat, &self.bbox)
            && in_polygon(location.lon, location.lat, &self.polygon)
    }
}

fn find_outer_ring(geojson: &geojson::GeoJson) -> Option<&Vec<geojson::Position>> {
    match geojson {
        geojson::GeoJson::FeatureCollection(collection) => collection
            .features
            .iter()
            .find_map(|feature| get_geometry_ring(feature.geometry.as_ref()?)),
        geojson::GeoJson::Feature(feature) => get_geometry_ring(feature.geometry.as_ref()?),
        geojson::GeoJson::Geometry(geometry) => get_geometry_ring(geometry),
    }
}

fn get_geometry_ring(geometry: &geojson::Geometry) -> Option<&Vec<geojson::Position>> {
    match &geometry.value {
        geojson::Value::Polygon(rings) => rings.first(),
        geojson::Value::MultiPolygon(polygons) => polygons.first()?.first(),
        _ => None,
    }
}
