//! Propriétés typées des features (Grab, Grabstelle)
//!
//! Le sac de propriétés GeoJSON est ouvert et non fiable. Il est validé ici,
//! à la frontière de classification, vers une union étiquetée. Un sac qui ne
//! passe pas la validation devient [`FeatureProperties::Unknown`] au lieu de
//! faire échouer le traitement.
//!
//! Les champs des tombes sont tolérants un par un : un champ annexe mal formé
//! devient `None` sans masquer `nutzungsfristende`. Pour un emplacement,
//! `verstorbene` porte la règle et reste strict.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nature des features d'un jeu de données
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Fiche de tombe (`grab`)
    Grave,
    /// Emplacement (`grabstelle`)
    Plot,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grave => write!(f, "grave"),
            Self::Plot => write!(f, "plot"),
        }
    }
}

/// Personne défunte
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, deserialize_with = "lenient_string")]
    pub vorname: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub nachname: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub beisetzungsart: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub zusatz: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub sterbedatum: Option<String>,
}

impl Person {
    /// "Vorname Nachname", en ignorant les parties absentes
    pub fn display_name(&self) -> String {
        [self.vorname.as_deref(), self.nachname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Propriétés d'une fiche de tombe
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraveProperties {
    /// Fin de la période d'utilisation
    #[serde(default, deserialize_with = "lenient_string")]
    pub nutzungsfristende: Option<String>,

    /// Fin de la période de repos
    #[serde(default, deserialize_with = "lenient_string")]
    pub ruhefristende: Option<String>,

    #[serde(default, deserialize_with = "lenient_persons")]
    pub verstorbene: Option<Vec<Person>>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub anonym: Option<bool>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub archiv: Option<bool>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub friedhof: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub geometrie_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grab_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabart: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabname: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabnummer: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabstatus: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabstelle: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub letzte_verstorbene: Option<String>,
}

/// Propriétés d'un emplacement
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotProperties {
    #[serde(default)]
    pub verstorbene: Option<Vec<Person>>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub friedhof: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grab_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabart: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub grabstelle: Option<String>,
}

/// Union étiquetée des propriétés connues
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureProperties {
    Grave(GraveProperties),
    Plot(PlotProperties),
    /// Sac de propriétés qui n'a pas passé la validation
    Unknown { reason: String },
}

impl FeatureProperties {
    /// Valide un sac de propriétés selon la nature du jeu de données
    pub fn from_bag(kind: FeatureKind, bag: &Map<String, Value>) -> Self {
        let value = Value::Object(bag.clone());
        let parsed = match kind {
            FeatureKind::Grave => serde_json::from_value(value).map(Self::Grave),
            FeatureKind::Plot => serde_json::from_value(value).map(Self::Plot),
        };
        parsed.unwrap_or_else(|e| Self::Unknown {
            reason: e.to_string(),
        })
    }

    /// Personnes défuntes (vide si absent)
    pub fn deceased(&self) -> &[Person] {
        let list = match self {
            Self::Grave(g) => g.verstorbene.as_deref(),
            Self::Plot(p) => p.verstorbene.as_deref(),
            Self::Unknown { .. } => None,
        };
        list.unwrap_or_default()
    }

    /// Date brute de fin d'utilisation (tombes uniquement)
    pub fn usage_end(&self) -> Option<&str> {
        match self {
            Self::Grave(g) => g.nutzungsfristende.as_deref(),
            _ => None,
        }
    }

    /// Identifiant métier de la tombe ou de l'emplacement
    pub fn grab_id(&self) -> Option<&str> {
        match self {
            Self::Grave(g) => g.grab_id.as_deref(),
            Self::Plot(p) => p.grab_id.as_deref(),
            Self::Unknown { .. } => None,
        }
    }
}

/// Accepte une chaîne, un nombre ou un booléen ; tout le reste donne `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Booléen, 0/1, ou chaîne "true"/"false", "ja"/"nein", "yes"/"no", "1"/"0"
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "ja" | "yes" | "1" => Some(true),
            "false" | "nein" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Liste de personnes ; les entrées illisibles sont ignorées
fn lenient_persons<'de, D>(deserializer: D) -> Result<Option<Vec<Person>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| Person::deserialize(item).ok())
                .collect(),
        ),
        _ => None,
    })
}
