//! # friedhof
//!
//! Modèle de données et traitements géométriques pour le WebGIS de cimetière
//! (fiches de tombes `grab`, emplacements `grabstelle`).
//!
//! ## Features
//!
//! - Décodage tolérant des FeatureCollection GeoJSON reçues du réseau
//! - Normalisation des coordonnées (anneau nu ou polygone) en anneau unique
//! - Propriétés typées (union étiquetée Grave / Plot / Unknown)
//! - Classification métier (tombe expirée, emplacement occupé)
//! - Agrégation d'emprise
//!
//! ## Usage
//!
//! ```rust,ignore
//! use friedhof::{classify, normalize, Extent, FeatureKind, FeatureProperties};
//!
//! let collection = friedhof::RawFeatureCollection::from_slice(&bytes)?;
//! let today = friedhof::classify::today();
//!
//! for feature in &collection.features {
//!     let ring = normalize(&feature.geometry()?.coordinates)?;
//!     let props = FeatureProperties::from_bag(FeatureKind::Grave, &feature.property_bag()?);
//!     println!("{} points, {}", ring.0.len(), classify(&props, today));
//! }
//! ```

pub mod classify;
pub mod error;
pub mod extent;
pub mod normalize;
pub mod properties;
pub mod types;

pub use classify::{classify, ClassificationTag};
pub use error::FriedhofError;
pub use extent::{aggregate, Extent};
pub use normalize::{normalize, normalize_polygon, NormalizedPolygon, RingPolicy};
pub use properties::{FeatureKind, FeatureProperties, GraveProperties, Person, PlotProperties};
pub use types::{ClassifiedFeature, RawFeature, RawFeatureCollection, RawGeometry, Ring};
