//! Normalisation du payload de coordonnées en anneau canonique
//!
//! Deux encodages arrivent du WebGIS :
//! - anneau nu : `[[x, y], [x, y], ...]` (profondeur 2)
//! - polygone : `[[[x, y], ...], [[x, y], ...]]` (profondeur ≥ 3)
//!
//! Pour un polygone, seul l'anneau extérieur est retenu par défaut et les
//! trous sont ignorés. [`RingPolicy::KeepHoles`] permet de les conserver.

use geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Ring;
use crate::FriedhofError;

/// Traitement des anneaux intérieurs d'un polygone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RingPolicy {
    /// Anneau extérieur uniquement, trous ignorés
    #[default]
    OuterOnly,
    /// Anneau extérieur + trous
    KeepHoles,
}

/// Anneau extérieur et trous éventuels
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPolygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

/// Normalise un payload de coordonnées en un anneau unique.
///
/// # Errors
///
/// [`FriedhofError::MalformedGeometry`] si le payload n'est pas un tableau,
/// s'il est vide, ou si un point n'est pas une paire de nombres.
pub fn normalize(payload: &Value) -> Result<Ring, FriedhofError> {
    normalize_polygon(payload, RingPolicy::OuterOnly).map(|polygon| polygon.exterior)
}

/// Comme [`normalize`], en conservant les trous selon `policy`.
///
/// # Errors
///
/// Voir [`normalize`]. Avec [`RingPolicy::KeepHoles`], un trou invalide rend
/// toute la géométrie invalide.
pub fn normalize_polygon(
    payload: &Value,
    policy: RingPolicy,
) -> Result<NormalizedPolygon, FriedhofError> {
    let items = payload.as_array().ok_or_else(|| {
        FriedhofError::malformed(format!(
            "coordinates must be an array, got {}",
            json_kind(payload)
        ))
    })?;
    let first = items
        .first()
        .ok_or_else(|| FriedhofError::malformed("coordinates array is empty"))?;

    if !is_array_of_arrays(first) {
        return Ok(NormalizedPolygon {
            exterior: parse_ring(payload, 0)?,
            holes: Vec::new(),
        });
    }

    let exterior = parse_ring(first, 0)?;
    let holes = match policy {
        RingPolicy::OuterOnly => {
            if items.len() > 1 {
                tracing::trace!(holes = items.len() - 1, "Dropping interior rings");
            }
            Vec::new()
        }
        RingPolicy::KeepHoles => items[1..]
            .iter()
            .enumerate()
            .map(|(i, ring)| parse_ring(ring, i + 1))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(NormalizedPolygon { exterior, holes })
}

fn is_array_of_arrays(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|items| items.first())
        .is_some_and(Value::is_array)
}

fn parse_ring(value: &Value, ring_index: usize) -> Result<Ring, FriedhofError> {
    let points = value.as_array().ok_or_else(|| {
        FriedhofError::malformed(format!("ring {} is not an array", ring_index))
    })?;
    if points.is_empty() {
        return Err(FriedhofError::malformed(format!(
            "ring {} is empty",
            ring_index
        )));
    }

    let coords = points
        .iter()
        .enumerate()
        .map(|(i, point)| parse_point(point, ring_index, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ring::new(coords))
}

/// Un point = au moins deux nombres finis ; Z et suivants sont ignorés
fn parse_point(value: &Value, ring_index: usize, index: usize) -> Result<Coord, FriedhofError> {
    let invalid = || {
        FriedhofError::malformed(format!(
            "ring {} point {} is not a coordinate pair: {}",
            ring_index, index, value
        ))
    };

    let ordinates = value.as_array().ok_or_else(invalid)?;
    if ordinates.len() < 2 {
        return Err(invalid());
    }
    let x = ordinates[0].as_f64().ok_or_else(invalid)?;
    let y = ordinates[1].as_f64().ok_or_else(invalid)?;
    if !x.is_finite() || !y.is_finite() {
        return Err(invalid());
    }
    Ok(Coord { x, y })
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
