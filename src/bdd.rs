//! The BDD manager backing every state and move set of the checker.
//!
//! All operations go through the [`Bdd`] manager, which hash-conses nodes and
//! caches ITE results, so structural equality of [`Ref`] handles is semantic
//! equality of the represented sets. Variables are 1-indexed `u32`s; smaller
//! indices sit higher in the ordering.

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;
use num_bigint::BigUint;

use crate::reference::Ref;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

/// Manager for all BDD nodes of one system.
///
/// Single-threaded by design: storage and caches live behind `RefCell`, and
/// handles are only meaningful for the manager that produced them.
pub struct Bdd {
    nodes: RefCell<Vec<Node>>,
    unique: RefCell<HashMap<Node, u32>>,
    ite_cache: RefCell<HashMap<(Ref, Ref, Ref), Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new()
    }
}

impl Bdd {
    pub fn new() -> Self {
        let terminal = Node {
            variable: 0,
            low: Ref::positive(1),
            high: Ref::positive(1),
        };
        // Index 0 is unused so that handles are never zero.
        let nodes = vec![terminal, terminal];
        let one = Ref::positive(1);
        Self {
            nodes: RefCell::new(nodes),
            unique: RefCell::new(HashMap::new()),
            ite_cache: RefCell::new(HashMap::new()),
            zero: -one,
            one,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len() - 1
    }

    pub fn variable(&self, index: usize) -> u32 {
        self.nodes.borrow()[index].variable
    }
    fn low(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].low
    }
    fn high(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == 1
    }

    /// Make (or find) the node `(v, low, high)`, maintaining canonicity:
    /// the high edge is never complemented and equal children collapse.
    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug_assert_ne!(v, 0, "variable index must not be zero");

        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }
        if low == high {
            return low;
        }

        debug_assert!(self.is_terminal(low) || self.variable(low.index()) > v);
        debug_assert!(self.is_terminal(high) || self.variable(high.index()) > v);

        let node = Node { variable: v, low, high };
        if let Some(&i) = self.unique.borrow().get(&node) {
            return Ref::positive(i);
        }
        let mut nodes = self.nodes.borrow_mut();
        let i = nodes.len() as u32;
        nodes.push(node);
        self.unique.borrow_mut().insert(node, i);
        Ref::positive(i)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        self.mk_node(v, self.zero, self.one)
    }

    /// Cofactors of `node` w.r.t. `v`, which must not be below the node's
    /// top variable.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        debug_assert_ne!(v, 0);
        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        debug_assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// ITE(f, g, h) = (f ∧ g) ∨ (¬f ∧ h) — the single binary-op kernel.
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Terminal cases.
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }

        // Standard triples: reduce g and h against f.
        let (mut f, mut g, mut h) = (f, g, h);
        if g == f {
            g = self.one;
        } else if g == -f {
            g = self.zero;
        }
        if h == f {
            h = self.zero;
        } else if h == -f {
            h = self.one;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if g == h {
            return g;
        }

        // Normalize: first argument positive.
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        // Normalize: second argument positive, complementing the result.
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = (f, g, h);
        if let Some(&res) = self.ite_cache.borrow().get(&key) {
            return if n { -res } else { res };
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        debug_assert_ne!(i, 0);
        let mut m = i;
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);
        debug!("apply_ite({}, {}, {}) -> {}", f, g, h, res);

        self.ite_cache.borrow_mut().insert(key, res);
        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }
    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }
    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }
    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }
    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }
    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }
    /// Set difference: u ∖ v.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, self.zero, u)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
        }
        res
    }

    /// Existential quantification of `f` over `cube`, a strictly increasing
    /// list of variables.
    pub fn exists(&self, f: Ref, cube: &[u32]) -> Ref {
        debug_assert!(cube.windows(2).all(|w| w[0] < w[1]), "cube must be sorted");
        let mut cache = HashMap::new();
        self.exists_(f, cube, &mut cache)
    }

    fn exists_(&self, f: Ref, mut cube: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) || cube.is_empty() {
            return f;
        }
        let v = self.variable(f.index());
        while !cube.is_empty() && cube[0] < v {
            cube = &cube[1..];
        }
        if cube.is_empty() {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let res = if cube[0] == v {
            let low = self.exists_(self.low_node(f), &cube[1..], cache);
            let high = self.exists_(self.high_node(f), &cube[1..], cache);
            self.apply_or(low, high)
        } else {
            let low = self.exists_(self.low_node(f), cube, cache);
            let high = self.exists_(self.high_node(f), cube, cache);
            self.mk_node(v, low, high)
        };
        cache.insert(f, res);
        res
    }

    /// Rename variables of `f` according to `map`.
    ///
    /// The map must preserve the variable order; the checker guarantees this
    /// by allocating present/next copies of every state bit adjacently.
    pub fn rename(&self, f: Ref, map: &HashMap<u32, u32>) -> Ref {
        let mut cache = HashMap::new();
        self.rename_(f, map, &mut cache)
    }

    fn rename_(&self, f: Ref, map: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let v = self.variable(f.index());
        let nv = map.get(&v).copied().unwrap_or(v);
        let low = self.rename_(self.low_node(f), map, cache);
        let high = self.rename_(self.high_node(f), map, cache);
        let res = self.mk_node(nv, low, high);
        cache.insert(f, res);
        res
    }

    /// One full minterm over `vars` contained in the non-empty set `f`.
    pub fn pick_one(&self, f: Ref, vars: &[u32]) -> Ref {
        assert!(!self.is_zero(f), "pick_one on the empty set");
        let mut cube = self.one;
        let mut cur = f;
        for &v in vars {
            let x = self.mk_var(v);
            let high = self.apply_and(cur, x);
            let (lit, rest) = if self.is_zero(high) {
                (-x, self.apply_and(cur, -x))
            } else {
                (x, high)
            };
            cube = self.apply_and(cube, lit);
            cur = rest;
        }
        cube
    }

    /// Number of satisfying assignments of `f` over `vars` (increasing, and
    /// covering the support of `f`).
    pub fn sat_count(&self, f: Ref, vars: &[u32]) -> BigUint {
        debug_assert!(vars.windows(2).all(|w| w[0] < w[1]));
        let mut cache = HashMap::new();
        self.sat_count_(f, vars, 0, &mut cache)
    }

    fn sat_count_(
        &self,
        f: Ref,
        vars: &[u32],
        i: usize,
        cache: &mut HashMap<(Ref, usize), BigUint>,
    ) -> BigUint {
        if self.is_zero(f) {
            return BigUint::from(0u32);
        }
        if i == vars.len() {
            debug_assert!(self.is_one(f), "support of f exceeds the given vars");
            return BigUint::from(1u32);
        }
        if let Some(res) = cache.get(&(f, i)) {
            return res.clone();
        }
        let v = vars[i];
        let res = if self.is_terminal(f) || v < self.variable(f.index()) {
            self.sat_count_(f, vars, i + 1, cache) * 2u32
        } else {
            let (f0, f1) = self.top_cofactors(f, v);
            self.sat_count_(f0, vars, i + 1, cache) + self.sat_count_(f1, vars, i + 1, cache)
        };
        cache.insert((f, i), res.clone());
        res
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_terminals() {
        let bdd = Bdd::new();
        assert!(bdd.is_one(bdd.one));
        assert!(bdd.is_zero(bdd.zero));
        assert_eq!(bdd.zero, -bdd.one);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_ite_is_and_or() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let ite = bdd.apply_ite(x, y, z);
        let manual = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, z));
        assert_eq!(ite, manual);
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        assert_eq!(bdd.exists(f, &[1]), y);
        assert_eq!(bdd.exists(f, &[2]), x);
        assert_eq!(bdd.exists(f, &[1, 2]), bdd.one);
        let g = bdd.apply_xor(x, y);
        assert_eq!(bdd.exists(g, &[2]), bdd.one);
    }

    #[test]
    fn test_rename_adjacent() {
        let bdd = Bdd::new();
        let f = bdd.apply_and(bdd.mk_var(1), -bdd.mk_var(3));
        let map = HashMap::from([(1, 2), (3, 4)]);
        let renamed = bdd.rename(f, &map);
        assert_eq!(renamed, bdd.apply_and(bdd.mk_var(2), -bdd.mk_var(4)));
    }

    #[test]
    fn test_pick_one() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, -y));
        let m = bdd.pick_one(f, &[1, 2]);
        // The minterm is a subset of f and assigns both variables.
        assert!(bdd.is_zero(bdd.apply_diff(m, f)));
        assert_eq!(bdd.sat_count(m, &[1, 2]), BigUint::from(1u32));
    }

    #[test]
    fn test_sat_count() {
        let bdd = Bdd::new();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        assert_eq!(bdd.sat_count(bdd.apply_or(x, y), &[1, 2]), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(bdd.one, &[1, 2, 3]), BigUint::from(8u32));
        assert_eq!(bdd.sat_count(bdd.zero, &[1, 2, 3]), BigUint::from(0u32));
    }
}
