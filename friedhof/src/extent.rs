//! Emprise (bounding box) agrégée des géométries

use geo::{Coord, Rect};

use crate::types::Ring;

/// Rectangle englobant aligné sur les axes.
///
/// L'emprise vide (aucun point) vaut `(+inf, +inf, -inf, -inf)` et se
/// distingue d'une emprise dégénérée réduite à un seul point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Extent {
    /// Emprise vide, élément neutre de l'agrégation
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Agrège tous les points de tous les anneaux
    pub fn from_rings<'a, I>(rings: I) -> Self
    where
        I: IntoIterator<Item = &'a Ring>,
    {
        rings.into_iter().fold(Self::EMPTY, |mut extent, ring| {
            ring.coords().for_each(|c| extent.extend(*c));
            extent
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Étend l'emprise pour contenir `coord`
    pub fn extend(&mut self, coord: Coord) {
        self.min_x = self.min_x.min(coord.x);
        self.min_y = self.min_y.min(coord.y);
        self.max_x = self.max_x.max(coord.x);
        self.max_y = self.max_y.max(coord.y);
    }

    /// Union de deux emprises
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Largeur (0 pour l'emprise vide)
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Hauteur (0 pour l'emprise vide)
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    pub fn center(&self) -> Option<Coord> {
        self.to_rect().map(|r| r.center())
    }

    pub fn to_rect(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        ))
    }

    /// `bbox` GeoJSON `[minX, minY, maxX, maxY]`, `None` si vide
    pub fn to_bbox(&self) -> Option<Vec<f64>> {
        if self.is_empty() {
            return None;
        }
        Some(vec![self.min_x, self.min_y, self.max_x, self.max_y])
    }
}

/// Emprise d'une liste d'anneaux
pub fn aggregate(rings: &[Ring]) -> Extent {
    Extent::from_rings(rings)
}
