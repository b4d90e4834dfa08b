use std::fmt;
use std::iter::FromIterator;
use std::cmp::max;

use crate::*;
use crate::data::model::*;
use crate::utils::Biterator;
use super::LabelId;

const CUSTSET_WORDS: usize = 2;

/// Bit 0 is reserved for the depot, so one less than the bit capacity.
pub const MAX_CUSTOMERS: usize = CUSTSET_WORDS * 128 - 1;

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Custset([u128; CUSTSET_WORDS]);

impl Custset {
  pub fn new() -> Self {
    return Self([0u128; CUSTSET_WORDS]);
  }

  pub fn iter<'a>(&'a self) -> impl Iterator<Item=Node> + 'a {
    self.0.iter()
      .enumerate()
      .map(|(k, &bits)| Biterator::new(bits).map(move |i| i as Node + ((k as Node) << 7)))
      .flatten()
  }

  pub fn to_vec(&self) -> Vec<Node> {
    self.iter().collect()
  }

  #[inline]
  pub fn insert(&mut self, i: Node) {
    let (word_index, bit_index) = Self::word_bit_index(&i);
    self.0[word_index] |= 1 << bit_index;
  }

  #[inline]
  fn word_bit_index(i: &Node) -> (usize, u16) {
    let word_index = (i >> 7) as usize; // divide by 128 = 2**7, rounding down;
    let bit_index = i & 0x7f; // modulo 128
    return (word_index, bit_index);
  }

  #[inline]
  pub fn contains(&self, i: &Node) -> bool {
    let (word_index, bit_index) = Self::word_bit_index(i);
    return (self.0[word_index] & (1 << bit_index)) != 0;
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.0.iter().map(|w| w.count_ones() as usize).sum()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.0.iter().all(|&w| w == 0)
  }

  #[inline]
  pub fn is_subset(&self, other: &Self) -> bool {
    self.0.iter().zip(other.0.iter()).all(|(x, y)| x & !y == 0)
  }
}


impl fmt::Debug for Custset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set()
      .entries(self.iter())
      .finish()
  }
}

impl<T: Into<u128>> FromIterator<T> for Custset {
  fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self {
    let mut words = [0u128; CUSTSET_WORDS];
    for i in iter {
      let i: u128 = i.into();
      let word_index = (i >> 7) as usize;
      let bit_index = i & 0x7f;
      words[word_index] |= 1 << bit_index;
    }
    return Self(words);
  }
}

/// A partial route. Append-only: labels are created by extension from a
/// parent and never mutated; the visit order lives out-of-line, keyed by id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
  pub node: Node,
  pub id: LabelId,
  pub visited: Custset,
  pub cost: Cost,
  pub reduced_cost: Cost,
  pub load: Demand,
  /// Departure time at `node`: service start plus service duration.
  pub time: Time,
}

impl Label {
  pub fn root(data: &CvrptwInstance) -> Self {
    return Label {
      node: data.depot,
      id: LabelId::new(),
      visited: Custset::new(),
      cost: 0.0,
      reduced_cost: 0.0,
      load: 0.0,
      time: data.earliest_departure,
    };
  }

  #[inline]
  pub fn stops(&self) -> usize {
    return self.visited.len();
  }

  /// Extend to customer `v`, or None if the extension breaks elementarity,
  /// the stop limit, capacity, or `v`'s time window.
  pub fn extend(&self, v: Node, data: &CvrptwInstance) -> Option<Label> {
    debug_assert!(data.is_customer(v));
    if self.visited.contains(&v) { return None; }
    if self.stops() + 1 > data.max_stops { return None; }

    let load = self.load + data.demand[&v];
    if load > data.capacity { return None; }

    let tt = match data.travel_time.get(&(self.node, v)) {
      None => return None,
      Some(&t) => t,
    };
    let arrival = self.time + tt;
    if arrival > data.tw_end[&v] { return None; }

    let arc_cost = data.travel_cost[&(self.node, v)];
    let mut visited = self.visited;
    visited.insert(v);

    return Some(Label {
      node: v,
      id: LabelId::new(),
      visited,
      cost: self.cost + arc_cost,
      reduced_cost: self.reduced_cost + arc_cost - data.dual(v),
      load,
      time: max(arrival, data.tw_start[&v]) + data.service_time,
    });
  }

  /// Close the route back at the depot; always permitted once at least one
  /// customer has been served. Returns the completed (cost, reduced cost).
  pub fn close(&self, data: &CvrptwInstance) -> Option<(Cost, Cost)> {
    if self.visited.is_empty() { return None; }
    let arc_cost = data.travel_cost[&(self.node, data.depot)];
    return Some((self.cost + arc_cost, self.reduced_cost + arc_cost));
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::testing::*;
  use crate::init_test_logging;
  use tracing::*;

  fn instance(duals: &[(i64, Cost)]) -> CvrptwInstance {
    let request = two_customer_request(duals);
    return CvrptwInstance::build(
      &request.warehouses[0], &request.customers, &request.duals, &request.params,
    );
  }

  #[test]
  fn label_size() {
    init_test_logging(None::<&str>);
    info!("size of Label = {} bytes", std::mem::size_of::<Label>());
    assert!(std::mem::size_of::<Label>() <= 80)
  }

  #[test]
  fn custset_insert() {
    let mut set = Custset::new();
    set.insert(1);
    assert_eq!(set.to_vec(), vec![1]);
    assert!(set.contains(&1));
    assert!(!set.contains(&2));
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn custset_from_iter() {
    fn check(vec: Vec<Node>) {
      let set: Custset = vec.iter().cloned().collect();
      assert_eq!(vec, set.to_vec())
    }
    check(vec![1]);
    check(vec![1, 9, 89, 99]);
    check(vec![1, 2, 3, 5, 128, 255]);
  }

  #[test]
  fn custset_subset() {
    let small: Custset = vec![1u16, 130].into_iter().collect();
    let big: Custset = vec![1u16, 7, 130].into_iter().collect();
    assert!(small.is_subset(&big));
    assert!(small.is_subset(&small));
    assert!(!big.is_subset(&small));
  }

  #[test]
  fn extension_accumulates_resources() {
    let data = instance(&[(11, 25.0), (12, 0.0)]);
    let root = Label::root(&data);
    let l = root.extend(1, &data).unwrap();

    assert_eq!(l.node, 1);
    assert_eq!(l.visited.to_vec(), vec![1]);
    assert_eq!(l.load, 1.0);
    assert!((l.cost - data.travel_cost[&(0, 1)]).abs() < 1e-12);
    assert!((l.reduced_cost - (l.cost - 25.0)).abs() < 1e-12);
    // window opens at departure, so the vehicle serves on arrival
    assert_eq!(l.time, DAY + data.travel_time[&(0, 1)] + data.service_time);
  }

  #[test]
  fn extension_waits_for_window() {
    let mut data = instance(&[(11, 0.0), (12, 0.0)]);
    let open = DAY + 7200;
    data.tw_start.insert(1, open);
    let l = Label::root(&data).extend(1, &data).unwrap();
    assert_eq!(l.time, open + data.service_time);
  }

  #[test]
  fn extension_respects_elementarity() {
    let data = instance(&[(11, 0.0), (12, 0.0)]);
    let l = Label::root(&data).extend(1, &data).unwrap();
    assert!(l.extend(1, &data).is_none());
    assert!(l.extend(2, &data).is_some());
  }

  #[test]
  fn extension_rejects_closed_window() {
    let mut data = instance(&[(11, 0.0), (12, 0.0)]);
    // window over before the vehicle can arrive
    data.tw_start.insert(1, DAY - 7200);
    data.tw_end.insert(1, DAY - 3600);
    assert!(Label::root(&data).extend(1, &data).is_none());
  }

  #[test]
  fn extension_rejects_overload() {
    let mut data = instance(&[(11, 0.0), (12, 0.0)]);
    data.demand.insert(1, 500.0);
    assert!(Label::root(&data).extend(1, &data).is_none());
  }

  #[test]
  fn extension_respects_stop_limit() {
    let mut data = instance(&[(11, 0.0), (12, 0.0)]);
    data.max_stops = 1;
    let l = Label::root(&data).extend(1, &data).unwrap();
    assert!(l.extend(2, &data).is_none());
  }

  #[test]
  fn closing_the_route() {
    let data = instance(&[(11, 40.0), (12, 0.0)]);
    let root = Label::root(&data);
    assert!(root.close(&data).is_none());

    let l = root.extend(1, &data).unwrap();
    let (cost, reduced_cost) = l.close(&data).unwrap();
    let round_trip = data.travel_cost[&(0, 1)] + data.travel_cost[&(1, 0)];
    assert!((cost - round_trip).abs() < 1e-12);
    assert!((reduced_cost - (round_trip - 40.0)).abs() < 1e-12);
  }
}
