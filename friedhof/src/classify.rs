//! Classification métier des features
//!
//! Règles, dans l'ordre :
//! - tombe dont la fin d'utilisation est strictement antérieure à la date du
//!   jour → `expired-grave`
//! - emplacement avec au moins une personne défunte → `occupied-plot`
//! - sinon → `none`
//!
//! La classification n'échoue jamais : une propriété manquante ou illisible
//! donne `none` et un avertissement.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::properties::FeatureProperties;

/// Tag de classification d'une feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationTag {
    #[default]
    None,
    ExpiredGrave,
    OccupiedPlot,
}

impl ClassificationTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExpiredGrave => "expired-grave",
            Self::OccupiedPlot => "occupied-plot",
        }
    }
}

impl std::fmt::Display for ClassificationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Résultat de classification avec avertissement éventuel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tag: ClassificationTag,
    pub warning: Option<String>,
}

impl Classification {
    fn tag(tag: ClassificationTag) -> Self {
        Self { tag, warning: None }
    }

    fn degraded(warning: impl Into<String>) -> Self {
        Self {
            tag: ClassificationTag::None,
            warning: Some(warning.into()),
        }
    }
}

/// Date du jour (horloge locale), à lire une seule fois par exécution
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Classe une feature par rapport à la date `today`
pub fn classify(properties: &FeatureProperties, today: NaiveDate) -> ClassificationTag {
    evaluate(properties, today).tag
}

/// Comme [`classify`], en remontant la raison d'une classification dégradée
pub fn evaluate(properties: &FeatureProperties, today: NaiveDate) -> Classification {
    match properties {
        FeatureProperties::Grave(grave) => match grave.nutzungsfristende.as_deref() {
            None => Classification::degraded("missing nutzungsfristende"),
            Some(raw) => match parse_date(raw) {
                Some(end) if end < today => Classification::tag(ClassificationTag::ExpiredGrave),
                Some(_) => Classification::tag(ClassificationTag::None),
                None => Classification::degraded(format!("unparseable nutzungsfristende: {:?}", raw)),
            },
        },
        FeatureProperties::Plot(_) if !properties.deceased().is_empty() => {
            Classification::tag(ClassificationTag::OccupiedPlot)
        }
        FeatureProperties::Plot(_) => Classification::tag(ClassificationTag::None),
        FeatureProperties::Unknown { reason } => {
            Classification::degraded(format!("invalid properties: {}", reason))
        }
    }
}

/// Parse une date calendaire.
///
/// Formats acceptés : `YYYY-MM-DD`, RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (avec `T` ou espace), `DD.MM.YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%d.%m.%Y").ok()
}
