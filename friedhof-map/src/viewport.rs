//! Cadrage de la carte sur une emprise
//!
//! Résolution Web Mercator au niveau `z` : `2πR / 256 / 2^z` mètres par
//! pixel (tuiles de 256 px). Une emprise dans un autre CRS est d'abord
//! ramenée en Web Mercator par ses quatre coins.

use friedhof::Extent;
use geo::Coord;
use thiserror::Error;
use tracing::debug;

use crate::reproject_lite::{Crs, Reprojector, RADIUS};

const TILE_SIZE: f64 = 256.0;

/// Erreurs de cadrage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("Cannot fit view: extent is empty")]
    EmptyExtent,

    #[error("Viewport {width}x{height} is too small for padding {padding}")]
    ViewportTooSmall { width: u32, height: u32, padding: u32 },
}

/// Options de cadrage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    /// Taille de la carte en pixels
    pub width: u32,
    pub height: u32,
    /// Marge sur chaque bord, en pixels
    pub padding: u32,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            padding: 50,
            min_zoom: 17.0,
            max_zoom: 19.0,
        }
    }
}

/// Vue calculée (Web Mercator)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub center: Coord,
    pub zoom: f64,
    /// Mètres par pixel au niveau `zoom`
    pub resolution: f64,
}

/// Résolution au niveau de zoom `zoom`
pub fn resolution_at(zoom: f64) -> f64 {
    2.0 * std::f64::consts::PI * RADIUS / TILE_SIZE / 2f64.powf(zoom)
}

/// Niveau de zoom (fractionnaire) correspondant à `resolution`
pub fn zoom_for(resolution: f64) -> f64 {
    (2.0 * std::f64::consts::PI * RADIUS / TILE_SIZE / resolution).log2()
}

/// Cadre la vue sur `extent`, exprimée dans `crs`
pub fn fit(extent: &Extent, crs: Crs, options: &ViewOptions) -> Result<View, ViewportError> {
    if extent.is_empty() {
        return Err(ViewportError::EmptyExtent);
    }

    let inner_width = f64::from(options.width) - 2.0 * f64::from(options.padding);
    let inner_height = f64::from(options.height) - 2.0 * f64::from(options.padding);
    if inner_width <= 0.0 || inner_height <= 0.0 {
        return Err(ViewportError::ViewportTooSmall {
            width: options.width,
            height: options.height,
            padding: options.padding,
        });
    }

    let extent = to_web_mercator(extent, crs);
    let resolution = (extent.width() / inner_width).max(extent.height() / inner_height);

    // emprise ponctuelle : zoom maximal
    let zoom = if resolution > 0.0 {
        zoom_for(resolution)
    } else {
        options.max_zoom
    };
    let zoom = zoom.clamp(options.min_zoom, options.max_zoom);

    let center = extent.center().ok_or(ViewportError::EmptyExtent)?;
    debug!(x = center.x, y = center.y, zoom, "View fitted");

    Ok(View {
        center,
        zoom,
        resolution: resolution_at(zoom),
    })
}

fn to_web_mercator(extent: &Extent, crs: Crs) -> Extent {
    if crs == Crs::WebMercator {
        return *extent;
    }
    let reprojector = Reprojector::new(crs, Crs::WebMercator);
    let corners = [
        (extent.min_x, extent.min_y),
        (extent.min_x, extent.max_y),
        (extent.max_x, extent.min_y),
        (extent.max_x, extent.max_y),
    ];

    let mut projected = Extent::EMPTY;
    for (x, y) in corners {
        let (x, y) = reprojector.transform_point(x, y);
        projected.extend(Coord { x, y });
    }
    projected
}
