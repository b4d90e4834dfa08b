use std::fmt;
use anyhow::{anyhow, Context, Result};
use chrono::DateTime;

use crate::Map;
use crate::cvrptw::label::MAX_CUSTOMERS;

pub mod geo;
pub mod model;

use model::*;

/// One pricing call: customers, warehouses, the dual-price vector from the
/// master problem and the scalar solver parameters.
#[derive(Debug, Clone)]
pub struct PricingRequest {
    pub customers: Vec<Customer>,
    pub warehouses: Vec<Warehouse>,
    pub duals: Map<i64, Cost>,
    pub params: SolverParams,
}

#[derive(Debug, Clone)]
pub enum ValidationError {
    BadCoordinate { id: i64, lat: f64, lng: f64 },
    NegativeDemand { id: i64, demand: f64 },
    ReversedWindow { id: i64 },
    DuplicateId { id: i64 },
    UnknownDualKey { id: i64 },
    NonFiniteNumber { field: &'static str },
    NumericOverflow { field: &'static str },
    BadParameter { field: &'static str },
    NoWarehouse,
    TooManyCustomers { count: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ValidationError {}


fn parse_timestamp(val: &json::JsonValue, field: &str) -> Result<Time> {
    let s = val.as_str().ok_or_else(|| anyhow!("missing or non-string field: {}", field))?;
    let ts = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp in field {}: {}", field, s))?;
    return Ok(ts.timestamp());
}

fn parse_f64(val: &json::JsonValue, field: &'static str) -> Result<f64> {
    return val.as_f64().ok_or_else(|| anyhow!("missing or non-numeric field: {}", field));
}

fn parse_i64(val: &json::JsonValue, field: &'static str) -> Result<i64> {
    return val.as_i64().ok_or_else(|| anyhow!("missing or non-integer field: {}", field));
}

impl PricingRequest {
    pub fn parse(raw: &str) -> Result<Self> {
        let root = json::parse(raw).map_err(|e| anyhow!("malformed request JSON: {}", e))?;
        return Self::from_json(&root);
    }

    pub fn from_json(root: &json::JsonValue) -> Result<Self> {
        let mut customers = Vec::new();
        for c in root["customers"].members() {
            let id = parse_i64(&c["id"], "customers[].id")?;
            customers.push(Customer {
                id,
                lat: parse_f64(&c["lat"], "customers[].lat")?,
                lng: parse_f64(&c["lng"], "customers[].lng")?,
                demand: parse_f64(&c["capacity"], "customers[].capacity")?,
                window_start: parse_timestamp(&c["window_start"], "customers[].window_start")?,
                window_end: parse_timestamp(&c["window_end"], "customers[].window_end")?,
            });
        }

        let mut warehouses = Vec::new();
        for w in root["warehouses"].members() {
            warehouses.push(Warehouse {
                id: parse_i64(&w["id"], "warehouses[].id")?,
                lat: parse_f64(&w["lat"], "warehouses[].lat")?,
                lng: parse_f64(&w["lng"], "warehouses[].lng")?,
            });
        }

        let mut duals = Map::default();
        for (key, val) in root["dual_values"].entries() {
            let id: i64 = key.parse()
                .map_err(|_| anyhow!("dual key is not an integer customer id: {}", key))?;
            duals.insert(id, parse_f64(val, "dual_values[]")?);
        }

        let planning_date = root["planning_date"].as_str()
            .ok_or_else(|| anyhow!("missing or non-string field: planning_date"))?;
        let departure_hour = parse_i64(&root["departure_hour"], "departure_hour")?;
        let departure = DateTime::parse_from_rfc3339(
            &format!("{}T{:02}:00:00Z", planning_date, departure_hour)
        ).with_context(|| format!("bad planning_date/departure_hour: {} / {}", planning_date, departure_hour))?;

        let params = SolverParams {
            max_stops: parse_i64(&root["max_stops"], "max_stops")? as usize,
            max_capacity: parse_f64(&root["max_capacity"], "max_capacity")?,
            cost_per_km: parse_f64(&root["cost_per_km"], "cost_per_km")?,
            speed_kmh: parse_f64(&root["speed_kmh"], "speed_kmh")?,
            service_time: parse_i64(&root["service_minutes"], "service_minutes")? * 60,
            earliest_departure: departure.timestamp(),
        };

        let request = PricingRequest { customers, warehouses, duals, params };
        request.validate()?;
        return Ok(request);
    }

    /// Fatal-class checks; an instance that is merely infeasible passes.
    pub fn validate(&self) -> Result<()> {
        use ValidationError::*;

        if self.warehouses.is_empty() {
            return Err(NoWarehouse.into());
        }
        if self.customers.len() > MAX_CUSTOMERS {
            return Err(TooManyCustomers { count: self.customers.len() }.into());
        }

        let mut seen = crate::Set::default();
        for c in &self.customers {
            if !(-90.0..=90.0).contains(&c.lat) || !(-180.0..=180.0).contains(&c.lng)
                || !c.lat.is_finite() || !c.lng.is_finite() {
                return Err(BadCoordinate { id: c.id, lat: c.lat, lng: c.lng }.into());
            }
            if !c.demand.is_finite() {
                return Err(NonFiniteNumber { field: "capacity" }.into());
            }
            if c.demand < 0.0 {
                return Err(NegativeDemand { id: c.id, demand: c.demand }.into());
            }
            if c.window_start > c.window_end {
                return Err(ReversedWindow { id: c.id }.into());
            }
            if !seen.insert(c.id) {
                return Err(DuplicateId { id: c.id }.into());
            }
        }

        let mut seen = crate::Set::default();
        for w in &self.warehouses {
            if !(-90.0..=90.0).contains(&w.lat) || !(-180.0..=180.0).contains(&w.lng)
                || !w.lat.is_finite() || !w.lng.is_finite() {
                return Err(BadCoordinate { id: w.id, lat: w.lat, lng: w.lng }.into());
            }
            if !seen.insert(w.id) {
                return Err(DuplicateId { id: w.id }.into());
            }
        }

        for (&id, &price) in &self.duals {
            if !price.is_finite() {
                return Err(NonFiniteNumber { field: "dual_values" }.into());
            }
            if !self.customers.iter().any(|c| c.id == id) {
                return Err(UnknownDualKey { id }.into());
            }
        }

        let p = &self.params;
        if !p.max_capacity.is_finite() || !p.cost_per_km.is_finite() || !p.speed_kmh.is_finite() {
            return Err(NonFiniteNumber { field: "parameters" }.into());
        }
        if p.max_capacity < 0.0 {
            return Err(BadParameter { field: "max_capacity" }.into());
        }
        if p.cost_per_km < 0.0 {
            return Err(BadParameter { field: "cost_per_km" }.into());
        }
        if p.speed_kmh <= 0.0 {
            return Err(BadParameter { field: "speed_kmh" }.into());
        }
        if p.service_time < 0 {
            return Err(BadParameter { field: "service_minutes" }.into());
        }

        // worst-case accumulations must stay representable: no leg is longer
        // than half the Earth's circumference
        let worst_leg_km = 20_038.0;
        if !(p.cost_per_km * worst_leg_km * (p.max_stops as f64 + 1.0)).is_finite() {
            return Err(NumericOverflow { field: "cost_per_km" }.into());
        }
        if worst_leg_km / p.speed_kmh * 3600.0 > 1e15 {
            return Err(NumericOverflow { field: "speed_kmh" }.into());
        }
        return Ok(());
    }
}


#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub const DAY: Time = 1_696_118_400; // 2023-10-01T00:00:00Z
    pub const HORIZON: Time = 86_400;

    pub fn base_params() -> SolverParams {
        SolverParams {
            max_stops: 10,
            max_capacity: 100.0,
            cost_per_km: 1.0,
            speed_kmh: 60.0,
            service_time: 600,
            earliest_departure: DAY,
        }
    }

    pub fn depot() -> Warehouse {
        Warehouse { id: 1, lat: 47.0, lng: 8.0 }
    }

    /// A customer `slot` steps of 0.05 degrees latitude (about 5.6 km) north of the depot.
    pub fn customer_at(id: i64, slot: u32, demand: Demand) -> Customer {
        Customer {
            id,
            lat: 47.0 + 0.05 * slot as f64,
            lng: 8.0,
            demand,
            window_start: DAY,
            window_end: DAY + HORIZON,
        }
    }

    pub fn request_with(customers: Vec<Customer>, duals: &[(i64, Cost)]) -> PricingRequest {
        let mut m = Map::default();
        for &(id, price) in duals {
            m.insert(id, price);
        }
        return PricingRequest { customers, warehouses: vec![depot()], duals: m, params: base_params() };
    }

    pub fn two_customer_request(duals: &[(i64, Cost)]) -> PricingRequest {
        let customers = vec![
            customer_at(duals[0].0, 1, 1.0),
            customer_at(duals[1].0, 2, 1.0),
        ];
        return request_with(customers, duals);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::*;

    const REQUEST: &str = r#"{
        "planning_date": "2023-10-01",
        "departure_hour": 8,
        "customers": [
            {"id": 7, "lat": 47.05, "lng": 8.0, "capacity": 12.5,
             "window_start": "2023-10-01T09:00:00Z", "window_end": "2023-10-01T17:00:00Z"}
        ],
        "warehouses": [{"id": 1, "lat": 47.0, "lng": 8.0}],
        "dual_values": {"7": 55.0},
        "max_stops": 4,
        "max_capacity": 60.0,
        "cost_per_km": 1.2,
        "speed_kmh": 50.0,
        "service_minutes": 15
    }"#;

    #[test]
    fn parse_request() {
        let r = PricingRequest::parse(REQUEST).unwrap();
        assert_eq!(r.customers.len(), 1);
        assert_eq!(r.customers[0].id, 7);
        assert_eq!(r.customers[0].demand, 12.5);
        assert_eq!(r.customers[0].window_end - r.customers[0].window_start, 8 * 3600);
        assert_eq!(r.warehouses[0].id, 1);
        assert_eq!(r.duals[&7], 55.0);
        assert_eq!(r.params.service_time, 15 * 60);
        // departure is 08:00 UTC on the planning date
        assert_eq!(r.params.earliest_departure, DAY + 8 * 3600);
    }

    #[test]
    fn reject_bad_latitude() {
        let mut r = request_with(vec![customer_at(3, 1, 1.0)], &[]);
        r.customers[0].lat = 95.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn reject_reversed_window() {
        let mut r = request_with(vec![customer_at(3, 1, 1.0)], &[]);
        r.customers[0].window_start = r.customers[0].window_end + 1;
        assert!(r.validate().is_err());
    }

    #[test]
    fn reject_negative_demand() {
        let r = request_with(vec![customer_at(3, 1, -2.0)], &[]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn reject_unknown_dual_key() {
        let r = request_with(vec![customer_at(3, 1, 1.0)], &[(3, 10.0), (99, 5.0)]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn reject_non_finite_rate() {
        let mut r = request_with(vec![customer_at(3, 1, 1.0)], &[]);
        r.params.cost_per_km = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn reject_overflowing_rate() {
        let mut r = request_with(vec![customer_at(3, 1, 1.0)], &[]);
        r.params.cost_per_km = 1e306;
        assert!(r.validate().is_err());

        let mut r = request_with(vec![customer_at(3, 1, 1.0)], &[]);
        r.params.speed_kmh = 1e-12;
        assert!(r.validate().is_err());
    }

    #[test]
    fn infeasible_is_not_an_error() {
        // demand above capacity is a search outcome, not a validation failure
        let r = request_with(vec![customer_at(3, 1, 500.0)], &[]);
        assert!(r.validate().is_ok());
    }
}
