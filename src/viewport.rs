/*
 * Copyright 2021 Miklos Vajna
 *
 * SPDX-License-Identifier: MIT
 */

#![deny(warnings)]
#![warn(clippy::all)]
#![warn(missing_docs)]

//! The viewport module finds the map center and zoom level which frames a set of points.

use crate::geometry;
use crate::geometry::Location;
use std::f64::consts::PI;

/// The most detailed zoom level of the map.
pub const MAX_ZOOM: u8 = 18;

/// Size of a map tile, in pixels.
const TILE_SIZE: f64 = 256.0;

/// Size of the map view, in pixels. The span of the points has to stay under it.
const VIEWPORT_WIDTH: f64 = 800.0;
const VIEWPORT_HEIGHT: f64 = 600.0;

/// Latitude limit of the spherical Mercator projection.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Map center and zoom level.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ViewportExtent {
    /// Latitude of the center.
    pub center_lat: f64,
    /// Longitude of the center.
    pub center_lon: f64,
    /// Zoom level, at most MAX_ZOOM.
    pub zoom: u8,
}

impl ViewportExtent {
    /// Gets an openstreetmap.org link showing this extent.
    pub fn get_map_link(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?lat={}&lon={}&zoom={}&layers=M",
            self.center_lat, self.center_lon, self.zoom
        )
    }
}

/// Converts a coordinate to fractional tile numbers at `zoom`.
pub fn deg2num(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = f64::from(1_u32 << zoom);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    (x, y)
}

/// Converts fractional tile numbers at `zoom` to a (lat, lon) coordinate.
pub fn num2deg(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = f64::from(1_u32 << zoom);
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Computes the viewport framing `points`. Invalid points are ignored, None is returned if
/// nothing is left.
pub fn compute_extent(points: &[Location]) -> Option<ViewportExtent> {
    let points: Vec<Location> = points.iter().filter(|i| i.is_valid()).cloned().collect();
    let bbox = geometry::compute_bounding_box(&points)?;

    if bbox.width() == 0.0 || bbox.height() == 0.0 {
        return Some(ViewportExtent {
            center_lat: (bbox.min_lat + bbox.max_lat) / 2.0,
            center_lon: (bbox.min_lon + bbox.max_lon) / 2.0,
            zoom: MAX_ZOOM,
        });
    }

    // North-west and south-east corners.
    let (x0, y0) = deg2num(bbox.max_lat, bbox.min_lon, 0);
    let (x1, y1) = deg2num(bbox.min_lat, bbox.max_lon, 0);
    let mut zoom: u8 = 0;
    while zoom < MAX_ZOOM {
        let scale = f64::from(1_u32 << (zoom + 1)) * TILE_SIZE;
        if (x1 - x0) * scale >= VIEWPORT_WIDTH || (y1 - y0) * scale >= VIEWPORT_HEIGHT {
            break;
        }
        zoom += 1;
    }

    let n = f64::from(1_u32 << zoom);
    let (center_lat, center_lon) = num2deg((x0 + x1) / 2.0 * n, (y0 + y1) / 2.0 * n, zoom);
    Some(ViewportExtent {
        center_lat,
        center_lon,
        zoom,
    })
}
