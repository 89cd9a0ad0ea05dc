//! Pure graph algorithms over the dirty set: a topological evaluation
//! order via Kahn's algorithm, and precise cycle localisation via Tarjan's
//! SCC restricted to whatever Kahn's algorithm leaves stuck.
//!
//! Only nodes that truly form (or sit inside) a cycle are reported as
//! cycle members; a cell downstream of a cycle but not part of it still
//! gets a normal evaluation step, reading the cycle member's error value
//! like any other propagated input.

use std::collections::BinaryHeap;
use std::cmp::Reverse;

use rustc_hash::{FxHashMap, FxHashSet};

use formulon_common::Address;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Eval(Address),
    CycleError(Address),
}

/// Builds the order in which `nodes` (a set of dirty formula cells) should
/// be (re)computed. `deps_of` returns an address's dependency list, which
/// may include cells outside `nodes` — those are treated as already
/// available and don't constrain ordering.
pub fn plan(nodes: FxHashSet<Address>, deps_of: &impl Fn(&Address) -> Vec<Address>) -> Vec<Step> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut in_degree: FxHashMap<Address, usize> = FxHashMap::default();
    let mut dependents: FxHashMap<Address, Vec<Address>> = FxHashMap::default();
    for n in &nodes {
        let deps_in_set: Vec<Address> = deps_of(n).into_iter().filter(|d| nodes.contains(d)).collect();
        in_degree.insert(n.clone(), deps_in_set.len());
        for d in deps_in_set {
            dependents.entry(d).or_default().push(n.clone());
        }
    }

    let mut heap: BinaryHeap<Reverse<Address>> =
        in_degree.iter().filter(|(_, d)| **d == 0).map(|(a, _)| Reverse(a.clone())).collect();
    let mut steps = Vec::new();
    let mut resolved: FxHashSet<Address> = FxHashSet::default();

    while let Some(Reverse(addr)) = heap.pop() {
        steps.push(Step::Eval(addr.clone()));
        resolved.insert(addr.clone());
        if let Some(deps) = dependents.get(&addr) {
            for dependent in deps.clone() {
                if let Some(d) = in_degree.get_mut(&dependent) {
                    *d -= 1;
                    if *d == 0 {
                        heap.push(Reverse(dependent));
                    }
                }
            }
        }
    }

    let stuck: FxHashSet<Address> = nodes.into_iter().filter(|n| !resolved.contains(n)).collect();
    if stuck.is_empty() {
        return steps;
    }

    let cycle_members = tarjan_cycle_members(&stuck, deps_of);
    let mut sorted_members: Vec<Address> = cycle_members.iter().cloned().collect();
    sorted_members.sort();
    for m in sorted_members {
        steps.push(Step::CycleError(m));
    }

    let remaining: FxHashSet<Address> = stuck.into_iter().filter(|n| !cycle_members.contains(n)).collect();
    steps.extend(plan(remaining, deps_of));
    steps
}

/// Every node that is a member of a strongly-connected component of size
/// > 1, or a single node with a self-loop, restricted to `nodes`.
fn tarjan_cycle_members(nodes: &FxHashSet<Address>, deps_of: &impl Fn(&Address) -> Vec<Address>) -> FxHashSet<Address> {
    struct Tarjan<'a> {
        nodes: &'a FxHashSet<Address>,
        deps_of: &'a dyn Fn(&Address) -> Vec<Address>,
        index: FxHashMap<Address, usize>,
        lowlink: FxHashMap<Address, usize>,
        on_stack: FxHashSet<Address>,
        stack: Vec<Address>,
        counter: usize,
        members: FxHashSet<Address>,
    }

    impl<'a> Tarjan<'a> {
        fn visit(&mut self, v: &Address) {
            self.index.insert(v.clone(), self.counter);
            self.lowlink.insert(v.clone(), self.counter);
            self.counter += 1;
            self.stack.push(v.clone());
            self.on_stack.insert(v.clone());

            let edges: Vec<Address> = (self.deps_of)(v).into_iter().filter(|d| self.nodes.contains(d)).collect();
            let self_loop = edges.iter().any(|d| d == v);

            for w in &edges {
                if !self.index.contains_key(w) {
                    self.visit(w);
                    let w_low = self.lowlink[w];
                    let v_low = self.lowlink[v];
                    self.lowlink.insert(v.clone(), v_low.min(w_low));
                } else if self.on_stack.contains(w) {
                    let w_idx = self.index[w];
                    let v_low = self.lowlink[v];
                    self.lowlink.insert(v.clone(), v_low.min(w_idx));
                }
            }

            if self.lowlink[v] == self.index[v] {
                let mut component = Vec::new();
                loop {
                    let w = self.stack.pop().unwrap();
                    self.on_stack.remove(&w);
                    let is_v = w == *v;
                    component.push(w);
                    if is_v {
                        break;
                    }
                }
                if component.len() > 1 || self_loop {
                    self.members.extend(component);
                }
            }
        }
    }

    let mut t = Tarjan {
        nodes,
        deps_of,
        index: FxHashMap::default(),
        lowlink: FxHashMap::default(),
        on_stack: FxHashSet::default(),
        stack: Vec::new(),
        counter: 0,
        members: FxHashSet::default(),
    };
    for n in nodes {
        if !t.index.contains_key(n) {
            t.visit(n);
        }
    }
    t.members
}
