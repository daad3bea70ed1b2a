//! Types de données pour le crate friedhof

use geo::LineString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::ClassificationTag;
use crate::normalize::json_kind;
use crate::properties::FeatureProperties;
use crate::FriedhofError;

/// Un anneau : séquence ordonnée et non vide de points 2D
pub type Ring = LineString<f64>;

/// FeatureCollection GeoJSON telle que reçue du réseau (non fiable)
///
/// Seule l'enveloppe est validée au décodage. Chaque feature est conservée
/// telle quelle et validée individuellement par [`RawFeature::geometry`] et
/// [`RawFeature::property_bag`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFeatureCollection {
    /// Tag de type, doit valoir "FeatureCollection"
    #[serde(rename = "type")]
    pub kind: String,

    /// Features brutes
    pub features: Vec<RawFeature>,

    /// Membre `crs` optionnel (informatif uniquement, jamais validé)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub crs: Value,
}

impl RawFeatureCollection {
    /// Décode une FeatureCollection depuis des octets JSON.
    ///
    /// # Errors
    ///
    /// Retourne [`FriedhofError::Decode`] si le JSON est invalide, si le
    /// document n'est pas une `FeatureCollection` ou si `features` n'est pas
    /// un tableau.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FriedhofError> {
        let collection: Self = serde_json::from_slice(bytes)?;
        if collection.kind != "FeatureCollection" {
            return Err(FriedhofError::decode(format!(
                "expected type \"FeatureCollection\", got \"{}\"",
                collection.kind
            )));
        }
        Ok(collection)
    }

    /// Nom du CRS déclaré (`{"type":"name","properties":{"name":...}}`)
    pub fn declared_crs(&self) -> Option<&str> {
        self.crs.get("properties")?.get("name")?.as_str()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Une feature brute : géométrie et propriétés non typées.
///
/// Tout élément JSON du tableau `features` se décode ; les défauts de forme
/// sont remontés à la validation de la feature.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(from = "Value")]
pub struct RawFeature {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub geometry: Value,

    pub properties: Value,

    /// Raison du rejet si l'élément n'est pas un objet
    #[serde(skip)]
    invalid: Option<String>,
}

impl From<Value> for RawFeature {
    fn from(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Self {
                    invalid: Some(format!("feature must be an object, got {}", json_kind(&other))),
                    ..Self::default()
                }
            }
        };

        Self {
            kind: map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: map.remove("id").filter(|id| !id.is_null()),
            geometry: map.remove("geometry").unwrap_or(Value::Null),
            properties: map.remove("properties").unwrap_or(Value::Null),
            invalid: None,
        }
    }
}

impl RawFeature {
    /// Descripteur de géométrie validé.
    ///
    /// # Errors
    ///
    /// [`FriedhofError::MalformedGeometry`] si la feature n'est pas un objet,
    /// si la géométrie est absente, n'est pas un objet ou si son `type`
    /// n'est pas une chaîne. Le payload de coordonnées n'est pas validé ici.
    pub fn geometry(&self) -> Result<RawGeometry, FriedhofError> {
        if let Some(reason) = &self.invalid {
            return Err(FriedhofError::malformed(reason.clone()));
        }

        let geometry = match &self.geometry {
            Value::Null => return Err(FriedhofError::malformed("feature has no geometry")),
            Value::Object(map) => map,
            other => {
                return Err(FriedhofError::malformed(format!(
                    "geometry must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        let kind = match geometry.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(FriedhofError::malformed(format!(
                    "geometry type must be a string, got {}",
                    json_kind(other)
                )))
            }
            None => return Err(FriedhofError::malformed("geometry has no type")),
        };

        Ok(RawGeometry {
            kind,
            coordinates: geometry.get("coordinates").cloned().unwrap_or(Value::Null),
        })
    }

    /// Copie du sac de propriétés (vide si absent ou `null`).
    ///
    /// # Errors
    ///
    /// [`FriedhofError::MalformedProperties`] si `properties` n'est ni un
    /// objet ni `null`.
    pub fn property_bag(&self) -> Result<Map<String, Value>, FriedhofError> {
        match &self.properties {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map.clone()),
            other => Err(FriedhofError::malformed_properties(format!(
                "properties must be an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

/// Descripteur de géométrie : tag de type + payload de coordonnées arbitraire
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,

    pub coordinates: Value,
}

/// Feature normalisée, reprojetée et classée
#[derive(Debug, Clone)]
pub struct ClassifiedFeature {
    /// Index de la feature dans sa collection d'origine
    pub index: usize,

    /// Identifiant GeoJSON d'origine, s'il existe
    pub id: Option<Value>,

    /// Anneau extérieur, dans le CRS cible
    pub ring: Ring,

    /// Trous (vide sauf si la conservation des trous est activée)
    pub holes: Vec<Ring>,

    /// Copie du sac de propriétés d'origine
    pub properties: Map<String, Value>,

    /// Propriétés typées, validées à la classification
    pub typed: FeatureProperties,

    /// Tag de classification
    pub tag: ClassificationTag,
}

impl ClassifiedFeature {
    /// Vrai si la feature porte une date de fin d'utilisation (fiche de tombe)
    pub fn is_grave(&self) -> bool {
        self.properties.contains_key("nutzungsfristende")
    }
}
