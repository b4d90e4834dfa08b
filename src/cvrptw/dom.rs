use tracing::*;
use super::label::Label;

pub type PairwiseDominance = fn(&Label, &Label) -> bool;

/// How labels at the same node are compared. `Exact` keeps the search a valid
/// certificate of "no negative route"; `Relaxed` drops the visited-set
/// condition for speed. Chosen explicitly by the caller, never silently.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DominanceMode {
  Exact,
  Relaxed,
}

impl DominanceMode {
  pub fn criterion(self) -> PairwiseDominance {
    match self {
      DominanceMode::Exact => dominance_criteria::subset_exact,
      DominanceMode::Relaxed => dominance_criteria::resources_only,
    }
  }
}

pub mod dominance_criteria {
  use super::*;

  /// f dominates g: every completion open to g is open to f at no greater
  /// reduced cost. The subset condition is required under elementarity; a
  /// label with fewer visited customers has at least the extensions of one
  /// with more.
  pub fn subset_exact(f: &Label, g: &Label) -> bool {
    f.reduced_cost <= g.reduced_cost &&
      f.load <= g.load &&
      f.time <= g.time &&
      f.visited.is_subset(&g.visited)
  }

  /// Ignores the visited sets. Extension still keeps every path elementary,
  /// but a surviving label's visited set may block customers the discarded
  /// one could reach, so the "none" certificate is weakened.
  pub fn resources_only(f: &Label, g: &Label) -> bool {
    f.reduced_cost <= g.reduced_cost &&
      f.load <= g.load &&
      f.time <= g.time
  }
}

/// Test `new` against one node bucket. Returns None if an incumbent label
/// dominates `new` (ties keep the incumbent), otherwise inserts `new` and
/// returns the labels it evicted.
pub fn insert_undominated(bucket: &mut Vec<Label>, new: Label, crit: PairwiseDominance) -> Option<Vec<Label>> {
  debug_assert!(bucket.iter().all(|l| l.node == new.node));

  for l in bucket.iter() {
    if crit(l, &new) {
      trace!(target: "dominate", new=?new.id, by=?l.id, "discarded");
      return None;
    }
  }

  let mut evicted = Vec::new();
  bucket.retain(|l| {
    if crit(&new, l) {
      trace!(target: "dominate", old=?l.id, by=?new.id, "evicted");
      evicted.push(*l);
      return false;
    }
    return true;
  });
  bucket.push(new);
  return Some(evicted);
}


#[cfg(test)]
mod tests {
  use super::*;
  use super::dominance_criteria::*;
  use crate::cvrptw::LabelId;
  use crate::cvrptw::label::Custset;
  use crate::IntUid;

  fn label(visited: &[u16], reduced_cost: f64, load: f64, time: i64) -> Label {
    let set: Custset = visited.iter().cloned().collect();
    Label {
      node: 3,
      id: LabelId::new(),
      visited: set,
      cost: reduced_cost,
      reduced_cost,
      load,
      time,
    }
  }

  #[test]
  fn subset_condition_gates_domination() {
    let f = label(&[1, 3], -5.0, 2.0, 100);
    let g = label(&[1, 2, 3], -1.0, 3.0, 200);
    assert!(subset_exact(&f, &g));
    assert!(!subset_exact(&g, &f));

    // better on resources but incomparable visited sets
    let h = label(&[2, 3], -10.0, 1.0, 50);
    assert!(!subset_exact(&h, &f));
    assert!(resources_only(&h, &f));
  }

  #[test]
  fn worse_resource_blocks_domination() {
    let f = label(&[1, 3], -5.0, 2.0, 300);
    let g = label(&[1, 3], -1.0, 3.0, 200);
    // f is cheaper but later
    assert!(!subset_exact(&f, &g));
    assert!(!subset_exact(&g, &f));
  }

  #[test]
  fn insertion_evicts_dominated() {
    let mut bucket = vec![
      label(&[1, 3], -1.0, 3.0, 200),
      label(&[2, 3], -4.0, 1.0, 100),
    ];
    let new = label(&[3], -6.0, 0.5, 50);
    let evicted = insert_undominated(&mut bucket, new, subset_exact).unwrap();
    assert_eq!(evicted.len(), 2);
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].id, new.id);
  }

  #[test]
  fn tie_keeps_the_incumbent() {
    let first = label(&[1, 3], -2.0, 1.0, 100);
    let mut bucket = vec![first];
    let mut twin = label(&[1, 3], -2.0, 1.0, 100);
    twin.cost = first.cost;
    assert!(insert_undominated(&mut bucket, twin, subset_exact).is_none());
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].id, first.id);
  }

  #[test]
  fn incomparable_labels_coexist() {
    let mut bucket = vec![label(&[1, 3], -5.0, 2.0, 100)];
    let other = label(&[2, 3], -6.0, 3.0, 150);
    let evicted = insert_undominated(&mut bucket, other, subset_exact).unwrap();
    assert!(evicted.is_empty());
    assert_eq!(bucket.len(), 2);
  }
}
