use crate::Map;
use super::geo::{self, Haversine};

/// Absolute Unix timestamp in seconds; durations share the type.
pub type Time = i64;
pub type Cost = f64;
pub type Demand = f64;
/// Dense node index within one solve call: 0 is the depot, 1..=n the customers.
pub type Node = u16;

/// Tolerance for reduced-cost sign comparisons.
pub const EPSILON: Cost = 1e-9;

#[derive(Debug, Clone)]
pub struct Customer {
  pub id: i64,
  pub lat: f64,
  pub lng: f64,
  pub demand: Demand,
  pub window_start: Time,
  pub window_end: Time,
}

#[derive(Debug, Clone)]
pub struct Warehouse {
  pub id: i64,
  pub lat: f64,
  pub lng: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
  pub max_stops: usize,
  pub max_capacity: Demand,
  pub cost_per_km: f64,
  pub speed_kmh: f64,
  /// Service duration in seconds, shared by all customers.
  pub service_time: Time,
  /// The vehicle may not leave the depot before this instant.
  pub earliest_departure: Time,
}

/// Immutable per-depot view of one pricing call, over dense node indices.
#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct CvrptwInstance {
  pub depot_id: i64,
  pub depot: Node,
  pub n: Node,
  pub C: Vec<Node>,
  pub capacity: Demand,
  pub max_stops: usize,
  pub service_time: Time,
  pub earliest_departure: Time,
  pub travel_time: Map<(Node, Node), Time>,
  pub travel_cost: Map<(Node, Node), Cost>,
  pub demand: Map<Node, Demand>,
  pub tw_start: Map<Node, Time>,
  pub tw_end: Map<Node, Time>,
  pub duals: Map<Node, Cost>,
  customer_ids: Vec<i64>,
}

impl CvrptwInstance {
  pub fn build(depot: &Warehouse, customers: &[Customer], duals: &Map<i64, Cost>, params: &SolverParams) -> Self {
    let n = customers.len() as Node;

    let mut coords = Vec::with_capacity(customers.len() + 1);
    coords.push((depot.lat, depot.lng));
    coords.extend(customers.iter().map(|c| (c.lat, c.lng)));

    let (cost_per_km, speed_kmh) = (params.cost_per_km, params.speed_kmh);
    let arcs = geo::dist_matrix_pp(Haversine(), &coords, |d| {
      (cost_per_km * d, geo::travel_seconds(d, speed_kmh))
    });

    let mut travel_time = Map::with_capacity_and_hasher(arcs.len(), Default::default());
    let mut travel_cost = Map::with_capacity_and_hasher(arcs.len(), Default::default());
    for (arc, (cost, tt)) in arcs {
      travel_cost.insert(arc, cost);
      travel_time.insert(arc, tt);
    }

    let mut demand = Map::default();
    let mut tw_start = Map::default();
    let mut tw_end = Map::default();
    let mut dense_duals = Map::default();
    for (k, c) in customers.iter().enumerate() {
      let v = (k + 1) as Node;
      demand.insert(v, c.demand);
      tw_start.insert(v, c.window_start);
      tw_end.insert(v, c.window_end);
      dense_duals.insert(v, duals.get(&c.id).copied().unwrap_or(0.0));
    }

    return CvrptwInstance {
      depot_id: depot.id,
      depot: 0,
      n,
      C: (1..=n).collect(),
      capacity: params.max_capacity,
      max_stops: params.max_stops,
      service_time: params.service_time,
      earliest_departure: params.earliest_departure,
      travel_time,
      travel_cost,
      demand,
      tw_start,
      tw_end,
      duals: dense_duals,
      customer_ids: customers.iter().map(|c| c.id).collect(),
    };
  }

  #[inline]
  pub fn is_customer(&self, i: Node) -> bool {
    return i != self.depot;
  }

  #[inline]
  pub fn external_id(&self, v: Node) -> i64 {
    debug_assert!(self.is_customer(v));
    return self.customer_ids[(v - 1) as usize];
  }

  #[inline]
  pub fn dual(&self, v: Node) -> Cost {
    return self.duals.get(&v).copied().unwrap_or(0.0);
  }
}
