//! Définitions des ellipsoïdes

/// Ellipsoïde de référence (demi-grand axe + aplatissement)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,
    /// Aplatissement
    pub f: f64,
}

impl Ellipsoid {
    /// WGS84 (GPS, EPSG:326xx/327xx)
    pub const WGS84: Self = Self {
        a: 6378137.0,
        f: 1.0 / 298.257223563,
    };

    /// GRS80 (ETRS89, EPSG:258xx)
    /// Note: Quasi identique à WGS84, différence < 0.1mm
    pub const GRS80: Self = Self {
        a: 6378137.0,
        f: 1.0 / 298.257222101,
    };

    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// Première excentricité
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Troisième aplatissement n = f / (2 - f)
    pub fn n(&self) -> f64 {
        self.f / (2.0 - self.f)
    }
}
