//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Systèmes supportés (sources et cibles) :
//! - WGS84 géographique (EPSG:4326), en degrés
//! - Web Mercator (EPSG:3857, alias 900913 / 102100 / 102113 / 3785)
//! - UTM WGS84 nord/sud (EPSG:32601-32660, EPSG:32701-32760)
//! - UTM ETRS89 (EPSG:25828-25838), ex. 25832 pour la Rhénanie du Nord
//!
//! Toute transformation passe par les coordonnées géographiques. Un
//! [`Reprojector`] est immuable, `Copy`, et utilisable depuis plusieurs threads.

mod ellipsoid;
mod mercator;
mod utm;

use std::fmt;
use std::str::FromStr;

use friedhof::Ring;
use geo::Coord;
use thiserror::Error;

pub use ellipsoid::Ellipsoid;
pub use mercator::{web_mercator_to_geographic, MAX_LATITUDE, RADIUS};
use utm::Utm;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Identifiant de CRS non enregistré
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    #[error(
        "Unsupported CRS: {0}. Supported: EPSG:4326, EPSG:3857, EPSG:32601-32660, \
         EPSG:32701-32760, EPSG:25828-25838"
    )]
    Unsupported(String),
}

/// Datum d'une zone UTM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Wgs84,
    Etrs89,
}

impl Datum {
    fn ellipsoid(self) -> Ellipsoid {
        match self {
            Self::Wgs84 => Ellipsoid::WGS84,
            Self::Etrs89 => Ellipsoid::GRS80,
        }
    }
}

/// Système de référence spatial enregistré
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude en degrés
    Geographic,
    /// Mercator sphérique (mètres)
    WebMercator,
    /// Transverse Mercator universelle (mètres)
    Utm { zone: u8, south: bool, datum: Datum },
}

impl Crs {
    /// Parse `EPSG:n`, `urn:ogc:def:crs:EPSG::n`, `n` ou `CRS84`
    pub fn parse(id: &str) -> Result<Self, CrsError> {
        let unsupported = || CrsError::Unsupported(id.to_string());
        let upper = id.trim().to_ascii_uppercase();

        if upper == "CRS84" || upper.ends_with(":CRS84") {
            return Ok(Self::Geographic);
        }

        let code = if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // version optionnelle : "EPSG::25832" ou "EPSG:9.9.1:25832"
            rest.rsplit(':').next().unwrap_or(rest)
        } else if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else {
            upper.as_str()
        };
        let code: u32 = code.parse().map_err(|_| unsupported())?;

        Self::from_epsg(code).ok_or_else(unsupported)
    }

    /// CRS depuis un code EPSG
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Self::Geographic),
            3857 | 3785 | 900913 | 102100 | 102113 => Some(Self::WebMercator),
            32601..=32660 => Some(Self::utm(code - 32600, false, Datum::Wgs84)),
            32701..=32760 => Some(Self::utm(code - 32700, true, Datum::Wgs84)),
            25828..=25838 => Some(Self::utm(code - 25800, false, Datum::Etrs89)),
            _ => None,
        }
    }

    fn utm(zone: u32, south: bool, datum: Datum) -> Self {
        Self::Utm {
            zone: zone as u8,
            south,
            datum,
        }
    }

    /// Code EPSG canonique
    pub fn epsg(&self) -> u32 {
        match *self {
            Self::Geographic => 4326,
            Self::WebMercator => 3857,
            Self::Utm {
                zone,
                south: false,
                datum: Datum::Etrs89,
            } => 25800 + u32::from(zone),
            Self::Utm {
                zone,
                south,
                datum: _,
            } => (if south { 32700 } else { 32600 }) + u32::from(zone),
        }
    }

    /// Unités métriques (vs degrés)
    pub fn is_projected(&self) -> bool {
        !matches!(self, Self::Geographic)
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Projection instanciée (coefficients précalculés)
#[derive(Debug, Clone, Copy)]
enum Projection {
    Geographic,
    WebMercator,
    Utm(Utm),
}

impl Projection {
    fn new(crs: Crs) -> Self {
        match crs {
            Crs::Geographic => Self::Geographic,
            Crs::WebMercator => Self::WebMercator,
            Crs::Utm { zone, south, datum } => Self::Utm(Utm::new(zone, south, datum.ellipsoid())),
        }
    }

    fn to_geographic(&self, x: f64, y: f64) -> Geographic {
        match self {
            Self::Geographic => Geographic::from_degrees(x, y),
            Self::WebMercator => web_mercator_to_geographic(x, y),
            Self::Utm(utm) => utm.to_geographic(x, y),
        }
    }

    fn from_geographic(&self, geo: Geographic) -> (f64, f64) {
        match self {
            Self::Geographic => geo.to_degrees(),
            Self::WebMercator => mercator::geographic_to_web_mercator(geo),
            Self::Utm(utm) => utm.from_geographic(geo),
        }
    }
}

/// Reprojection ponctuelle entre deux CRS enregistrés
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    source: Crs,
    target: Crs,
    from: Projection,
    to: Projection,
}

impl Reprojector {
    /// Crée un nouveau reprojector
    pub fn new(source: Crs, target: Crs) -> Self {
        Self {
            source,
            target,
            from: Projection::new(source),
            to: Projection::new(target),
        }
    }

    /// Crée un reprojector depuis deux identifiants textuels
    ///
    /// # Errors
    ///
    /// [`CrsError::Unsupported`] si l'un des identifiants est inconnu.
    pub fn from_ids(source: &str, target: &str) -> Result<Self, CrsError> {
        Ok(Self::new(Crs::parse(source)?, Crs::parse(target)?))
    }

    pub fn source(&self) -> Crs {
        self.source
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    /// Pas de reprojection (source == cible)
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        if self.is_identity() {
            return (x, y);
        }
        // Étape 1: Source → Géographique, étape 2: Géographique → Cible
        self.to.from_geographic(self.from.to_geographic(x, y))
    }

    pub fn transform_coord(&self, coord: Coord) -> Coord {
        let (x, y) = self.transform_point(coord.x, coord.y);
        Coord { x, y }
    }

    /// Transforme chaque point d'un anneau, dans l'ordre
    pub fn reproject(&self, ring: &Ring) -> Ring {
        ring.coords().map(|c| self.transform_coord(*c)).collect()
    }

    /// Description lisible pour les logs
    pub fn description(&self) -> String {
        if self.is_identity() {
            format!("identity ({})", self.source)
        } else {
            format!("{} → {}", self.source, self.target)
        }
    }
}

/// Reprojette un anneau entre deux CRS identifiés par leur nom
///
/// # Errors
///
/// [`CrsError::Unsupported`] si l'un des identifiants est inconnu.
pub fn reproject(ring: &Ring, source: &str, target: &str) -> Result<Ring, CrsError> {
    Ok(Reprojector::from_ids(source, target)?.reproject(ring))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifiers() {
        let etrs = Crs::Utm {
            zone: 32,
            south: false,
            datum: Datum::Etrs89,
        };
        assert_eq!(Crs::parse("EPSG:25832").unwrap(), etrs);
        assert_eq!(Crs::parse("epsg:25832").unwrap(), etrs);
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::25832").unwrap(), etrs);
        assert_eq!(Crs::parse("25832").unwrap(), etrs);
        assert_eq!(Crs::parse("EPSG:900913").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(), Crs::Geographic);
        assert_eq!(
            Crs::parse("EPSG:32740").unwrap(),
            Crs::Utm {
                zone: 40,
                south: true,
                datum: Datum::Wgs84
            }
        );
    }

    #[test]
    fn test_unsupported_epsg() {
        assert_eq!(
            Crs::parse("EPSG:2154"),
            Err(CrsError::Unsupported("EPSG:2154".to_string()))
        );
        assert!(Crs::parse("EPSG:32661").is_err());
        assert!(Crs::parse("mercator").is_err());
        assert!(Reprojector::from_ids("EPSG:25832", "EPSG:99999").is_err());
        assert!(reproject(&Ring::from(vec![(0.0, 0.0)]), "foo", "EPSG:3857").is_err());
    }

    #[test]
    fn test_epsg_display() {
        assert_eq!(Crs::parse("25832").unwrap().to_string(), "EPSG:25832");
        assert_eq!(Crs::parse("32632").unwrap().to_string(), "EPSG:32632");
        assert_eq!(Crs::parse("32738").unwrap().epsg(), 32738);
        assert_eq!(Crs::parse("102100").unwrap().to_string(), "EPSG:3857");
    }

    #[test]
    fn test_utm_to_wgs84() {
        let reproj = Reprojector::from_ids("EPSG:32632", "EPSG:4326").unwrap();
        let (lon, lat) = reproj.transform_point(356560.0, 5645282.0);

        assert!((lon - 6.9583).abs() < 0.001, "lon={}", lon);
        assert!((lat - 50.9413).abs() < 0.001, "lat={}", lat);
    }

    #[test]
    fn test_utm_to_web_mercator() {
        let reproj = Reprojector::from_ids("EPSG:25832", "EPSG:3857").unwrap();
        let (x, y) = reproj.transform_point(386858.0, 5664073.0);

        // ≈ 7.3835°E, 51.1170°N
        assert!((x - 821925.0).abs() < 5.0, "x={}", x);
        assert!((y - 6642007.0).abs() < 5.0, "y={}", y);
    }

    #[test]
    fn test_ring_roundtrip() {
        let ring = Ring::from(vec![
            (386850.0, 5664070.0),
            (386858.5, 5664070.0),
            (386858.5, 5664073.25),
            (386850.0, 5664073.25),
            (386850.0, 5664070.0),
        ]);
        let forward = reproject(&ring, "EPSG:25832", "EPSG:3857").unwrap();
        let back = reproject(&forward, "EPSG:3857", "EPSG:25832").unwrap();

        assert_eq!(back.0.len(), ring.0.len());
        for (a, b) in ring.coords().zip(back.coords()) {
            assert!((a.x - b.x).abs() < 1e-6, "dx={}", a.x - b.x);
            assert!((a.y - b.y).abs() < 1e-6, "dy={}", a.y - b.y);
        }
    }

    #[test]
    fn test_identity() {
        let reproj = Reprojector::from_ids("EPSG:3857", "EPSG:900913").unwrap();
        assert!(reproj.is_identity());
        assert_eq!(reproj.transform_point(1.5, -2.5), (1.5, -2.5));
        assert!(reproj.description().starts_with("identity"));
    }

    #[test]
    fn test_reprojector_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Reprojector>();
    }
}
