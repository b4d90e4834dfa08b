use std::io::{Read, Write};
use std::time::Duration;
use rayon::ThreadPoolBuilder;
use anyhow::Result;
use chrono::{TimeZone, Utc};
use tracing::*;

use pricegen::*;
use pricegen::cvrptw::{search, DominanceMode};
use pricegen::cvrptw::search::{Route, SearchLimits, SolveOutcome};
use pricegen::data::PricingRequest;
use pricegen::data::model::Time;

mod common;
use common::*;

use structopt::StructOpt;

fn parse_dominance_mode(s: &str) -> Result<Option<DominanceMode>, String> {
  match s {
    "none" => Ok(None),
    "exact" => Ok(Some(DominanceMode::Exact)),
    "relaxed" => Ok(Some(DominanceMode::Relaxed)),
    s => Err(format!("{} is not recognised", s))
  }
}


#[derive(Debug, StructOpt)]
struct ClArgs {
    /// Request JSON file, or - for stdin
    input: String,
    #[structopt(long, short="c", default_value="1", validator=clap_range_validator(Some(1), None))]
    cpus: usize,
    #[structopt(long="no-preprocess", parse(from_flag=std::ops::Not::not))]
    preprocess: bool,
    #[structopt(long, parse(try_from_str=parse_dominance_mode), possible_values=&["exact", "relaxed", "none"], default_value="exact")]
    dominance: std::option::Option<DominanceMode>,
    /// Hard cap on processed labels; on exhaustion the best route found so far is kept
    #[structopt(long, default_value="1000000", validator=clap_range_validator(Some(1), None))]
    max_labels: usize,
    /// Wall-clock budget in seconds
    #[structopt(long)]
    time_limit: Option<u64>,
    /// Drop labels whose reduced cost exceeds the incumbent's by this margin (inexact)
    #[structopt(long)]
    prune_margin: Option<f64>,
    #[structopt(flatten)]
    output: OutputOptions,
}


fn rfc3339(t: Time) -> String {
    return Utc.timestamp_opt(t, 0).single().expect("schedule times are valid instants").to_rfc3339();
}

fn route_record(route: &Route) -> json::JsonValue {
    return json::object! {
        warehouse: route.warehouse,
        stops: json::JsonValue::from(route.stops.clone()),
        cost: route.cost,
        reduced_cost: route.reduced_cost,
        load: route.load,
        schedule: json::JsonValue::from(route.schedule.iter().map(|&t| rfc3339(t)).collect::<Vec<_>>()),
    };
}

impl PricingReport for SolveOutcome {
    fn write_json(&self, mut buf: impl Write) -> Result<()> {
        let root = match &self.route {
            Some(route) => route_record(route),
            None => json::JsonValue::Null,
        };
        root.write_pretty(&mut buf, 2)?;
        return Ok(())
    }

    fn write_json_summary(&self, mut buf: impl Write) -> Result<()> {
        let mut root: json::JsonValue = self.size_info.clone().into();
        root["truncated"] = self.truncated.into();
        root["route"] = match &self.route {
            Some(route) => route_record(route),
            None => json::JsonValue::Null,
        };
        root.write_pretty(&mut buf, 2)?;
        return Ok(())
    }
}


fn main() -> anyhow::Result<()> {
    let args: ClArgs = StructOpt::from_args();
    let _g = init_logging(args.output.log.clone());
    debug!(?args);
    ThreadPoolBuilder::new().num_threads(args.cpus).build_global().expect("Failed to construct thread pool");

    let raw = if args.input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)?
    };
    let request = PricingRequest::parse(&raw)?;

    let limits = SearchLimits {
        max_labels: args.max_labels,
        time_limit: args.time_limit.map(Duration::from_secs),
        prune_margin: args.prune_margin,
    };
    let outcome = search::solve(&request, args.dominance, &limits, args.preprocess)?;
    write_report(&args.output, outcome)?;
    Ok(())
}
