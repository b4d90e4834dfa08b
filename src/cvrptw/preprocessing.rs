use std::cmp::max;
use tracing::*;

use crate::Set;
use crate::data::model::*;

#[instrument(level="debug", skip(data))]
fn drop_oversized_customers(data: &mut CvrptwInstance) {
    let dropped: Set<Node> = data.C.iter().copied()
        .filter(|v| data.demand[v] > data.capacity)
        .collect();
    if dropped.is_empty() { return; }

    debug!(count = dropped.len(), "dropping customers whose demand alone exceeds capacity");
    data.C.retain(|v| !dropped.contains(v));
    data.travel_time.retain(|(i, j), _| !dropped.contains(i) && !dropped.contains(j));
    data.travel_cost.retain(|(i, j), _| !dropped.contains(i) && !dropped.contains(j));
}


#[instrument(level="debug", skip(data))]
fn tighten_time_windows(data: &mut CvrptwInstance) {
    let depot = data.depot;
    let earliest_departure = data.earliest_departure;
    for &v in &data.C {
        let tt = match data.travel_time.get(&(depot, v)) {
            None => continue,
            Some(&t) => t,
        };
        // arrival can never precede leaving the depot at the planning start
        let t = earliest_departure + tt;
        let tw_start_v = data.tw_start.get_mut(&v).unwrap();
        #[cfg(debug_assertions)]
            if *tw_start_v < t { trace!(v, old = *tw_start_v, new = t, "tighten TW LB"); }
        *tw_start_v = max(*tw_start_v, t);
    }
}


fn remove_arcs(data: &mut CvrptwInstance) {
    let parent_span = span!(Level::DEBUG, "remove_arcs");
    let _g = parent_span.enter();

    let depot = data.depot;
    let mut illegal_arcs: Set<(Node, Node)> = Set::default();

    for &v in &data.C {
        if let Some(&tt) = data.travel_time.get(&(depot, v)) {
            if data.earliest_departure + tt > data.tw_end[&v] {
                // window closes before the vehicle can ever arrive
                illegal_arcs.insert((depot, v));
            }
        }
    }

    for &u in &data.C {
        for &v in &data.C {
            if u == v || !data.travel_time.contains_key(&(u, v)) { continue; }

            if data.demand[&u] + data.demand[&v] > data.capacity {
                illegal_arcs.insert((u, v));
                continue;
            }
            // earliest service at u is its (tightened) window start
            if data.tw_start[&u] + data.service_time + data.travel_time[&(u, v)] > data.tw_end[&v] {
                illegal_arcs.insert((u, v));
            }
        }
    }

    // closing arcs back to the depot are never removed; a route may always
    // return home
    debug_assert!(illegal_arcs.iter().all(|&(_, j)| j != depot));

    let num_arcs_initial = data.travel_time.len();
    for arc in illegal_arcs.iter() {
        trace!(?arc, "removed");
        data.travel_time.remove(arc);
        data.travel_cost.remove(arc);
    }
    debug!("Removed {} arcs, {} remaining", num_arcs_initial - data.travel_time.len(), data.travel_time.len());
}


pub fn preprocess(data: &mut CvrptwInstance) {
    let s = span!(Level::DEBUG, "preprocess", warehouse = data.depot_id);
    let _g = s.enter();
    drop_oversized_customers(data);
    tighten_time_windows(data);
    remove_arcs(data);
}
