use std::cmp::max;
use tracing::*;

use crate::*;
use crate::data::model::*;

pub mod dom;
pub mod label;
pub mod preprocessing;
pub mod search;

pub use dom::DominanceMode;
pub use search::{solve, Route, SearchLimits, SolveOutcome};

define_nonzero_u32_id_type!(LabelId);

pub mod schedule {
    use super::*;
    use itertools::Itertools;

    /// Service-start times for a depot-to-depot path, forward pass. The first
    /// entry is the actual depot departure (as late as possible, so the
    /// vehicle never waits before its first stop), the last is the arrival
    /// back at the depot. Returns None on a missing arc or a time-window
    /// violation.
    #[instrument(skip(data))]
    pub fn try_service_times(path: &[Node], data: &CvrptwInstance) -> Option<Vec<Time>> {
        debug_assert!(path.len() >= 3);
        debug_assert_eq!(path[0], data.depot);
        debug_assert_eq!(*path.last().unwrap(), data.depot);

        // travel_time[m] is the travel time from path[m] to path[m+1]
        let travel_time = {
            let mut tt = Vec::with_capacity(path.len() - 1);
            for (&i, &j) in path.iter().tuple_windows() {
                match data.travel_time.get(&(i, j)) {
                    None => {
                        trace!(i, j, "no arc");
                        return None;
                    }
                    Some(&t) => tt.push(t),
                }
            }
            tt
        };

        let mut service_start: Vec<Time> = Vec::with_capacity(path.len());
        service_start.push(data.earliest_departure);

        for m in 1..path.len() {
            let j = path[m];
            let service = if m == 1 { 0 } else { data.service_time };
            let arrival = service_start[m - 1] + service + travel_time[m - 1];

            if j == data.depot {
                // closing the route; no window applies on the way home
                debug_assert_eq!(m, path.len() - 1);
                service_start.push(arrival);
                continue;
            }

            if arrival > data.tw_end[&j] {
                trace!(schedule=?service_start, index=m, "time window violation");
                return None;
            }
            service_start.push(max(arrival, data.tw_start[&j]));
        }

        // depart as late as the first stop allows
        service_start[0] = service_start[1] - travel_time[0];

        trace!(schedule=?service_start, "schedule found");
        return Some(service_start);
    }

    #[inline]
    pub fn check(path: &[Node], data: &CvrptwInstance) -> bool {
        return try_service_times(path, data).is_some();
    }

    /// Travel cost of the path, summed over its arcs.
    pub fn path_cost(path: &[Node], data: &CvrptwInstance) -> Cost {
        return path.iter()
            .tuple_windows()
            .map(|(&i, &j)| data.travel_cost[&(i, j)])
            .sum();
    }

    /// Travel cost minus the dual prices of the visited customers.
    pub fn reduced_cost(path: &[Node], data: &CvrptwInstance) -> Cost {
        let duals: Cost = path.iter()
            .filter(|&&i| data.is_customer(i))
            .map(|&i| data.dual(i))
            .sum();
        return path_cost(path, data) - duals;
    }
}
