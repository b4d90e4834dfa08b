use num::{Num, cast::AsPrimitive};
use crate::Map;
use super::model::{Node, Time};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub trait Metric {
  const SYM: bool = false;

  fn compute<T: Num + AsPrimitive<f64>>(p1: (T, T), p2: (T, T)) -> f64;
}

/// Great-circle distance between two (latitude, longitude) pairs in degrees, in kilometres.
pub struct Haversine();

impl Metric for Haversine {
  const SYM: bool = true;

  fn compute<T: Num + AsPrimitive<f64>>(p1: (T, T), p2: (T, T)) -> f64 {
    let (lat1, lon1) = (p1.0.as_().to_radians(), p1.1.as_().to_radians());
    let (lat2, lon2) = (p2.0.as_().to_radians(), p2.1.as_().to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) +
      lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    return EARTH_RADIUS_KM * c;
  }
}

#[inline]
pub fn travel_seconds(distance_km: f64, speed_kmh: f64) -> Time {
  return (distance_km / speed_kmh * 3600.0).round() as Time;
}

/// Compute the arc map for the given coordinates, with a post-processing
/// function applied to each raw distance. Self-arcs are not created.
pub fn dist_matrix_pp<M, S>(_metric: M, coords: &[(f64, f64)], func: impl Fn(f64) -> S) -> Map<(Node, Node), S>
  where
    M: Metric,
    S: Copy
{
  let mut matrix = Map::default();
  let n = coords.len();
  if M::SYM {
    for i in 0..n {
      let p1 = coords[i];
      for j in (i + 1)..n {
        let p2 = coords[j];
        let d = func(M::compute(p1, p2));
        matrix.insert((i as Node, j as Node), d);
        matrix.insert((j as Node, i as Node), d);
      }
    }
  } else {
    for i in 0..n {
      let p1 = coords[i];
      for j in 0..n {
        if i == j { continue; }
        let d = func(M::compute(p1, coords[j]));
        matrix.insert((i as Node, j as Node), d);
      }
    }
  }
  return matrix;
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn haversine_one_degree_latitude() {
    // one degree of latitude is EARTH_RADIUS_KM * pi / 180 km everywhere
    let d = Haversine::compute((47.0, 8.0), (48.0, 8.0));
    let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
    assert!((d - expected).abs() < 1e-6, "{} vs {}", d, expected);
  }

  #[test]
  fn haversine_symmetric_and_zero() {
    let p = (47.3769, 8.5417);
    let q = (47.0502, 8.3093);
    assert_eq!(Haversine::compute(p, q), Haversine::compute(q, p));
    assert_eq!(Haversine::compute(p, p), 0.0);
  }

  #[test]
  fn travel_time_rounding() {
    // 30 km at 60 km/h is exactly half an hour
    assert_eq!(travel_seconds(30.0, 60.0), 1800);
    assert_eq!(travel_seconds(0.0, 60.0), 0);
  }

  #[test]
  fn matrix_has_no_self_arcs() {
    let coords = vec![(47.0, 8.0), (47.1, 8.0), (47.2, 8.1)];
    let m = dist_matrix_pp(Haversine(), &coords, |d| d);
    assert_eq!(m.len(), 6);
    assert!(!m.contains_key(&(0, 0)));
    assert_eq!(m[&(0, 1)], m[&(1, 0)]);
  }
}
