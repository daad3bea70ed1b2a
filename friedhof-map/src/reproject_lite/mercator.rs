//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Utilisé par Google Maps, OpenStreetMap, etc.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::Geographic;

/// Rayon de la sphère (rayon équatorial WGS84)
pub const RADIUS: f64 = 6378137.0;

/// Latitude limite du carré Web Mercator
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Convertit coordonnées géographiques vers Web Mercator (EPSG:3857)
pub fn geographic_to_web_mercator(geo: Geographic) -> (f64, f64) {
    // Limiter la latitude pour éviter l'infini
    let limit = MAX_LATITUDE.to_radians();
    let lat = geo.lat.clamp(-limit, limit);

    let x = RADIUS * geo.lon;
    let y = RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln();

    (x, y)
}

/// Convertit Web Mercator vers coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let lon = x / RADIUS;
    let lat = 2.0 * (y / RADIUS).exp().atan() - FRAC_PI_2;

    Geographic::new(lon, lat)
}
