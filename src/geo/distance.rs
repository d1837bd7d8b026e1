//! Geodesic distances in meters.
//!
//! The primary formula is Vincenty's inverse solution on the WGS-84 ellipsoid,
//! accurate to well under a millimeter. It can fail to converge for nearly
//! antipodal points, in which case the haversine great-circle distance on the
//! mean Earth radius is used instead (error below 0.5%).

use super::Coordinates;
use std::f64::consts::PI;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = (1.0 - WGS84_F) * WGS84_A;

const MEAN_EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_TOLERANCE: f64 = 1e-12;

pub fn geodesic_distance_meters(from: Coordinates, to: Coordinates) -> f64 {
    vincenty_distance_meters(from, to).unwrap_or_else(|| haversine_distance_meters(from, to))
}

pub fn haversine_distance_meters(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards against h drifting above 1.0 by rounding
    2.0 * MEAN_EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Returns `None` when the iteration does not converge.
fn vincenty_distance_meters(from: Coordinates, to: Coordinates) -> Option<f64> {
    let mut l = (to.lon - from.lon).to_radians();
    if l > PI {
        l -= 2.0 * PI;
    } else if l < -PI {
        l += 2.0 * PI;
    }
    let u1 = ((1.0 - WGS84_F) * from.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * to.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // coincident points
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos_sq_alpha == 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(WGS84_B * big_a * (sigma - delta_sigma));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} +/- {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn same_point_is_zero() {
        let p = Coordinates::new(55.7512, 37.6184);
        assert_eq!(geodesic_distance_meters(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_on_equator() {
        let d = geodesic_distance_meters(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 1.0));
        // a * pi / 180
        assert_close(d, 111_319.49, 0.01);
    }

    #[test]
    fn known_long_distance() {
        // Flinders Peak to Buninyong, the classic Vincenty reference pair
        let flinders = Coordinates::new(-37.951_033_416_7, 144.424_867_888_9);
        let buninyong = Coordinates::new(-37.652_821_138_9, 143.926_495_527_8);
        assert_close(geodesic_distance_meters(flinders, buninyong), 54_972.271, 0.05);
    }

    #[test]
    fn distance_is_symmetric_and_non_negative() {
        let pairs = [
            (Coordinates::new(55.7512, 37.6184), Coordinates::new(55.7530, 37.6200)),
            (Coordinates::new(-33.8688, 151.2093), Coordinates::new(51.5074, -0.1278)),
            (Coordinates::new(89.9, 0.0), Coordinates::new(-45.0, 120.0)),
            (Coordinates::new(0.0, -179.9), Coordinates::new(0.0, 179.9)),
        ];
        for (a, b) in pairs {
            let ab = geodesic_distance_meters(a, b);
            let ba = geodesic_distance_meters(b, a);
            assert!(ab >= 0.0);
            assert_close(ab, ba, 1e-6 * ab.max(1.0));
        }
    }

    #[test]
    fn nearly_antipodal_points_fall_back_to_haversine() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.5, 179.7);
        assert!(vincenty_distance_meters(a, b).is_none());

        let d = geodesic_distance_meters(a, b);
        assert_eq!(d, haversine_distance_meters(a, b));
        assert!(d > 19_900_000.0 && d < 20_040_000.0);
    }

    #[test]
    fn haversine_agrees_with_vincenty_on_short_distances() {
        let a = Coordinates::new(55.7512, 37.6184);
        let b = Coordinates::new(55.7530, 37.6184);
        let vincenty = geodesic_distance_meters(a, b);
        let haversine = haversine_distance_meters(a, b);
        assert!((vincenty - haversine).abs() / vincenty < 0.005);
    }
}
