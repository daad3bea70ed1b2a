//! Projection UTM (Universal Transverse Mercator)
//!
//! Série de Krüger à l'ordre 6 en n (Karney 2011), avec inversion exacte de
//! la latitude conforme par itération de Newton. Aller-retour au nanomètre
//! dans la zone.

use super::ellipsoid::Ellipsoid;
use super::Geographic;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500000.0;
const FALSE_NORTHING_SOUTH: f64 = 10000000.0;

/// Zone UTM avec coefficients précalculés
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utm {
    zone: u8,
    south: bool,
    lon0: f64,
    e: f64,
    e2: f64,
    /// k0 * A (rayon rectifiant mis à l'échelle)
    k0_a: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl Utm {
    /// `zone` entre 1 et 60
    pub fn new(zone: u8, south: bool, ellipsoid: Ellipsoid) -> Self {
        let n = ellipsoid.n();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let a_rect = ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1983433.0 / 1935360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
                + 167603.0 / 181440.0 * n6,
            49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
            34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
            212378941.0 / 319334400.0 * n6,
        ];
        let beta = [
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604800.0 * n6,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1118711.0 / 3870720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
            4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
            20648693.0 / 638668800.0 * n6,
        ];

        Self {
            zone,
            south,
            lon0: (f64::from(zone) * 6.0 - 183.0).to_radians(),
            e: ellipsoid.e(),
            e2: ellipsoid.e2(),
            k0_a: K0 * a_rect,
            alpha,
            beta,
        }
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn is_south(&self) -> bool {
        self.south
    }

    fn false_northing(&self) -> f64 {
        if self.south {
            FALSE_NORTHING_SOUTH
        } else {
            0.0
        }
    }

    /// Géographique → UTM (mètres)
    pub fn from_geographic(&self, geo: Geographic) -> (f64, f64) {
        let lam = geo.lon - self.lon0;
        let tau_p = self.conformal_tau(geo.lat.tan());

        let xi_p = tau_p.atan2(lam.cos());
        let eta_p = (lam.sin() / tau_p.hypot(lam.cos())).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        (
            FALSE_EASTING + self.k0_a * eta,
            self.false_northing() + self.k0_a * xi,
        )
    }

    /// UTM (mètres) → géographique
    pub fn to_geographic(&self, x: f64, y: f64) -> Geographic {
        let xi = (y - self.false_northing()) / self.k0_a;
        let eta = (x - FALSE_EASTING) / self.k0_a;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let tau_p = xi_p.sin() / eta_p.sinh().hypot(xi_p.cos());
        let lam = eta_p.sinh().atan2(xi_p.cos());
        let lat = self.geodetic_tau(tau_p).atan();

        Geographic::new(self.lon0 + lam, lat)
    }

    /// tan(latitude conforme) depuis tan(latitude géodésique)
    fn conformal_tau(&self, tau: f64) -> f64 {
        let sigma = (self.e * (self.e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
    }

    /// Inverse de `conformal_tau` (Newton)
    fn geodetic_tau(&self, tau_p: f64) -> f64 {
        let one_minus_e2 = 1.0 - self.e2;
        let mut tau = tau_p / one_minus_e2;

        for _ in 0..10 {
            let tau_pi = self.conformal_tau(tau);
            let delta = (tau_p - tau_pi) * (1.0 + one_minus_e2 * tau * tau)
                / (one_minus_e2 * (1.0 + tau_pi * tau_pi).sqrt() * (1.0 + tau * tau).sqrt());
            tau += delta;
            if delta.abs() <= 1e-15 * tau.abs().max(1.0) {
                break;
            }
        }
        tau
    }
}
