//! Export vers GeoJSON (crate `geojson`)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use friedhof::{ClassifiedFeature, Extent};
use geo::Polygon;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::reproject_lite::Crs;

/// Nom de la propriété portant le tag de classification
pub const CLASSIFICATION_PROPERTY: &str = "classification";

/// Construit la FeatureCollection d'une collection classée.
///
/// La `bbox` est l'emprise des seules features de la collection.
pub fn to_feature_collection(features: &[ClassifiedFeature], crs: Crs) -> FeatureCollection {
    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) }
        }),
    );

    FeatureCollection {
        bbox: Extent::from_rings(features.iter().map(|f| &f.ring)).to_bbox(),
        features: features.iter().map(to_feature).collect(),
        foreign_members: Some(foreign_members),
    }
}

/// Convertit une feature classée ; `Polygon::new` ferme les anneaux ouverts
fn to_feature(feature: &ClassifiedFeature) -> Feature {
    let polygon = Polygon::new(feature.ring.clone(), feature.holes.clone());

    let mut properties = feature.properties.clone();
    properties.insert(
        CLASSIFICATION_PROPERTY.to_string(),
        JsonValue::from(feature.tag.as_str()),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&polygon))),
        id: feature.id.as_ref().and_then(to_id),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn to_id(value: &JsonValue) -> Option<Id> {
    match value {
        JsonValue::String(s) => Some(Id::String(s.clone())),
        JsonValue::Number(n) => Some(Id::Number(n.clone())),
        _ => None,
    }
}

/// Exporte une collection classée dans un fichier GeoJSON
pub fn export_to_geojson(
    features: &[ClassifiedFeature],
    crs: Crs,
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let collection = to_feature_collection(features, crs);
    serde_json::to_writer(&mut writer, &collection)
        .context(format!("Failed to write GeoJSON: {}", output_path.display()))?;
    writer.flush()?;

    Ok(())
}
