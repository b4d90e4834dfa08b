use std::collections::HashMap;
use std::time::{Duration, Instant};
use rayon::prelude::*;
use tracing::*;

use crate::*;
use crate::data::PricingRequest;
use crate::data::model::*;
use super::{schedule, LabelId};
use super::dom::{self, DominanceMode};
use super::label::Label;
use super::preprocessing;

#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    /// Hard cap on processed labels; exhaustion keeps the best route found.
    pub max_labels: usize,
    /// Wall-clock budget, checked between waves.
    pub time_limit: Option<Duration>,
    /// Discard labels whose reduced cost exceeds the incumbent's by this
    /// margin. A label's reduced cost can still fall by collecting duals, so
    /// any finite margin trades completeness for speed.
    pub prune_margin: Option<Cost>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits { max_labels: 1_000_000, time_limit: None, prune_margin: None }
    }
}

/// A priced column: one depot-to-depot route with negative reduced cost.
#[derive(Debug, Clone)]
pub struct Route {
    pub warehouse: i64,
    /// External customer ids in visit order, depots excluded.
    pub stops: Vec<i64>,
    pub cost: Cost,
    pub reduced_cost: Cost,
    pub load: Demand,
    /// Service-start times; first entry is the depot departure, last the
    /// arrival back at the depot.
    pub schedule: Vec<Time>,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub route: Option<Route>,
    /// True when a budget cut the search short; the result is then the best
    /// found so far rather than a proven optimum (or proven absence).
    pub truncated: bool,
    pub size_info: HashMap<String, isize>,
}

struct Incumbent {
    path: Vec<Node>,
    cost: Cost,
    reduced_cost: Cost,
    load: Demand,
}

#[derive(Debug, Default)]
struct SearchStats {
    processed: usize,
    created: usize,
    dominated: usize,
    evicted: usize,
    pruned: usize,
    completed: usize,
    truncated: bool,
}

impl SearchStats {
    fn absorb(&mut self, o: &SearchStats) {
        self.processed += o.processed;
        self.created += o.created;
        self.dominated += o.dominated;
        self.evicted += o.evicted;
        self.pruned += o.pruned;
        self.completed += o.completed;
        self.truncated |= o.truncated;
    }
}

/// Label-setting over one depot's instance. Each wave of unprocessed labels
/// is extended in parallel (extension is pure); completed routes and bucket
/// insertions are merged sequentially, so bucket state has a single owner.
#[instrument(level="info", skip(data, limits), fields(warehouse = data.depot_id))]
fn search_depot(data: &CvrptwInstance, dominance: Option<DominanceMode>, limits: &SearchLimits)
    -> (Option<Incumbent>, SearchStats)
{
    let crit = dominance.map(DominanceMode::criterion);
    let deadline = limits.time_limit.map(|d| Instant::now() + d);

    let mut buckets: Map<Node, Vec<Label>> = Map::default();
    let mut paths: Map<LabelId, Vec<Node>> = Map::default();
    let mut stats = SearchStats::default();
    let mut best: Option<Incumbent> = None;

    let root = Label::root(data);
    paths.insert(root.id, vec![data.depot]);
    let mut wave = vec![root];

    while !wave.is_empty() {
        if let Some(t) = deadline {
            if Instant::now() >= t {
                stats.truncated = true;
                warn!(processed = stats.processed, truncated = true,
                      "time budget exhausted, keeping best route found so far");
                break;
            }
        }
        if stats.processed + wave.len() > limits.max_labels {
            stats.truncated = true;
            wave.truncate(limits.max_labels - stats.processed);
            warn!(processed = stats.processed, truncated = true,
                  "label budget exhausted, keeping best route found so far");
        }

        // extensions are pure; candidates are generated in ascending customer
        // order so lexicographically smaller sequences insert first
        let extensions: Vec<_> = wave.par_iter()
            .map(|l| {
                let children: Vec<_> = data.C.iter().filter_map(|&v| l.extend(v, data)).collect();
                (l.id, l.load, children, l.close(data))
            })
            .collect();

        let mut next_wave = Vec::new();
        for (parent, parent_load, children, closure) in extensions {
            stats.processed += 1;

            let parent_path = match paths.get(&parent) {
                // evicted earlier in this merge by a dominating sibling
                None => continue,
                Some(p) => p.clone(),
            };

            if let Some((cost, reduced_cost)) = closure {
                stats.completed += 1;
                if best.as_ref().map_or(true, |b| reduced_cost < b.reduced_cost) {
                    let mut path = parent_path.clone();
                    path.push(data.depot);
                    trace!(?path, reduced_cost, "new incumbent");
                    best = Some(Incumbent { path, cost, reduced_cost, load: parent_load });
                }
            }

            for child in children {
                stats.created += 1;

                if let (Some(margin), Some(b)) = (limits.prune_margin, best.as_ref()) {
                    if child.reduced_cost > b.reduced_cost + margin {
                        stats.pruned += 1;
                        continue;
                    }
                }

                let bucket = buckets.entry(child.node).or_insert_with(Vec::new);
                let evicted = match crit {
                    Some(c) => match dom::insert_undominated(bucket, child, c) {
                        None => {
                            stats.dominated += 1;
                            continue;
                        }
                        Some(evicted) => evicted,
                    },
                    None => {
                        bucket.push(child);
                        Vec::new()
                    }
                };

                for old in evicted {
                    stats.evicted += 1;
                    paths.remove(&old.id);
                }

                let mut path = parent_path.clone();
                path.push(child.node);
                paths.insert(child.id, path);
                next_wave.push(child);
            }
        }

        // drop labels a later sibling evicted before they were ever processed
        next_wave.retain(|l| paths.contains_key(&l.id));
        wave = next_wave;

        if stats.truncated { break; }
    }

    debug!(processed = stats.processed, created = stats.created,
           dominated = stats.dominated, evicted = stats.evicted,
           pruned = stats.pruned, completed = stats.completed,
           "search finished");
    return (best, stats);
}

/// Run the pricing search once per warehouse and keep the best column, or
/// None when no route prices out (reduced cost below -EPSILON).
#[instrument(level="info", skip(request, limits))]
pub fn solve(request: &PricingRequest, dominance: Option<DominanceMode>, limits: &SearchLimits, preprocess: bool)
    -> anyhow::Result<SolveOutcome>
{
    request.validate()?;

    let mut best: Option<(Incumbent, CvrptwInstance)> = None;
    let mut totals = SearchStats::default();

    for wh in &request.warehouses {
        let mut data = CvrptwInstance::build(wh, &request.customers, &request.duals, &request.params);
        if preprocess {
            preprocessing::preprocess(&mut data);
        }
        let data = data;

        let (incumbent, stats) = search_depot(&data, dominance, limits);
        totals.absorb(&stats);

        if let Some(inc) = incumbent {
            if best.as_ref().map_or(true, |(b, _)| inc.reduced_cost < b.reduced_cost) {
                best = Some((inc, data));
            }
        }
    }

    let mut size_info = HashMap::default();
    size_info.insert("customers".to_string(), request.customers.len() as isize);
    size_info.insert("warehouses".to_string(), request.warehouses.len() as isize);
    size_info.insert("labels_processed".to_string(), totals.processed as isize);
    size_info.insert("labels_created".to_string(), totals.created as isize);
    size_info.insert("labels_dominated".to_string(), totals.dominated as isize);
    size_info.insert("labels_evicted".to_string(), totals.evicted as isize);
    size_info.insert("labels_pruned".to_string(), totals.pruned as isize);
    size_info.insert("routes_completed".to_string(), totals.completed as isize);

    let route = match best {
        Some((inc, data)) if inc.reduced_cost < -EPSILON => {
            let times = match schedule::try_service_times(&inc.path, &data) {
                None => {
                    error!(path=?inc.path, "no schedule for incumbent route");
                    panic!("bug - incumbent route should have a schedule")
                }
                Some(t) => t,
            };
            debug_assert!((schedule::path_cost(&inc.path, &data) - inc.cost).abs() < 1e-6);
            debug_assert!((schedule::reduced_cost(&inc.path, &data) - inc.reduced_cost).abs() < 1e-6);

            info!(reduced_cost = inc.reduced_cost, stops = inc.path.len() - 2, "route priced out");
            Some(Route {
                warehouse: data.depot_id,
                stops: inc.path[1..inc.path.len() - 1].iter().map(|&v| data.external_id(v)).collect(),
                cost: inc.cost,
                reduced_cost: inc.reduced_cost,
                load: inc.load,
                schedule: times,
            })
        }
        _ => {
            info!(truncated = totals.truncated, "no negative reduced cost route");
            None
        }
    };

    return Ok(SolveOutcome { route, truncated: totals.truncated, size_info });
}
