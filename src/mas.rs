//! Multi-agent transition systems.
//!
//! A [`MultiAgentSystem`] is a symbolic Kripke structure whose joint actions
//! are partitioned among named agents, each with an observational window on
//! the state variables. State bits are allocated in adjacent (present, next)
//! pairs so that present/next renaming preserves the variable order; action
//! bits have no next copies.
//!
//! Systems are built programmatically with [`MasBuilder`]: scalar state
//! variables, per-agent action variables, observability, protocol
//! constraints, init/transition relations, fairness constraints and named
//! state sets (atoms).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::dispatch::{CacheEntry, CacheKey};
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::symbolic::SymbolicStore;

/// Index of an agent within its system.
pub type AgentId = usize;

/// Handle to a scalar state variable declared on a builder.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScalarVar(usize);

#[derive(Debug, Clone)]
struct Scalar {
    name: String,
    values: Vec<String>,
    /// Present-state bits, least significant first.
    bits: Vec<u32>,
    next_bits: Vec<u32>,
}

#[derive(Debug, Clone)]
struct AgentData {
    name: String,
    action_values: Vec<String>,
    /// Action bits, least significant first. No next copies.
    action_bits: Vec<u32>,
    /// Present-state bits this agent observes.
    observables: Vec<u32>,
}

fn bits_for(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

fn value_cube(bdd: &Bdd, bits: &[u32], value: usize) -> Ref {
    let mut cube = bdd.one;
    for (j, &bit) in bits.iter().enumerate() {
        let x = bdd.mk_var(bit);
        cube = bdd.apply_and(cube, if value >> j & 1 == 1 { x } else { -x });
    }
    cube
}

fn domain_mask(bdd: &Bdd, bits: &[u32], count: usize) -> Ref {
    let mut mask = bdd.zero;
    for value in 0..count {
        mask = bdd.apply_or(mask, value_cube(bdd, bits, value));
    }
    mask
}

fn merge_sorted(parts: &[&[u32]]) -> Vec<u32> {
    let mut out: Vec<u32> = parts.iter().flat_map(|p| p.iter().copied()).collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// A finite multi-agent transition system over a shared BDD manager.
pub struct MultiAgentSystem {
    bdd: Rc<Bdd>,
    scalars: Vec<Scalar>,
    agents: Vec<AgentData>,
    agent_index: HashMap<String, AgentId>,
    groups: HashMap<String, Vec<String>>,
    labels: HashMap<String, Ref>,

    /// All (present, next) pairs, model layer first, then layers allocated
    /// by the symbolic strategy encoding.
    state_pairs: RefCell<Vec<(u32, u32)>>,
    model_state_vars: Vec<u32>,
    model_si_vars: Vec<u32>,
    input_vars: Vec<u32>,
    var_counter: Cell<u32>,

    init: Ref,
    trans: Ref,
    protocol_all: Ref,
    states_mask: Ref,
    inputs_mask: Ref,
    states_inputs_mask: Ref,
    fairness: Vec<Ref>,

    reachable: RefCell<Option<Ref>>,
    fair: RefCell<Option<Ref>>,
    protocols: RefCell<HashMap<Vec<AgentId>, Ref>>,
    eval_cache: RefCell<HashMap<CacheKey, CacheEntry>>,
    symbolic: RefCell<SymbolicStore>,
}

impl MultiAgentSystem {
    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub fn init(&self) -> Ref {
        self.init
    }
    pub fn trans(&self) -> Ref {
        self.trans
    }
    pub fn states_mask(&self) -> Ref {
        self.states_mask
    }
    pub fn inputs_mask(&self) -> Ref {
        self.inputs_mask
    }
    pub fn states_inputs_mask(&self) -> Ref {
        self.states_inputs_mask
    }
    pub fn fairness_constraints(&self) -> &[Ref] {
        &self.fairness
    }

    /// Present-state bits of the model layer.
    pub fn states_cube(&self) -> &[u32] {
        &self.model_state_vars
    }
    /// All action bits.
    pub fn inputs_cube(&self) -> &[u32] {
        &self.input_vars
    }
    /// Model present-state bits and action bits, merged.
    pub fn state_inputs_vars(&self) -> &[u32] {
        &self.model_si_vars
    }

    pub fn inputs_cube_for_agents(&self, agents: &[AgentId]) -> Vec<u32> {
        let parts: Vec<&[u32]> = agents.iter().map(|&a| self.agents[a].action_bits.as_slice()).collect();
        merge_sorted(&parts)
    }

    /// Action bits of every agent outside the coalition.
    pub fn others_inputs_cube(&self, agents: &[AgentId]) -> Vec<u32> {
        let mine = self.inputs_cube_for_agents(agents);
        self.input_vars.iter().copied().filter(|v| !mine.contains(v)).collect()
    }

    /// Every agent of the system, in declaration order.
    pub fn all_agents(&self) -> Vec<AgentId> {
        (0..self.agents.len()).collect()
    }

    /// The next-state partner of a present-state bit.
    pub(crate) fn next_state_var(&self, present: u32) -> u32 {
        self.state_pairs
            .borrow()
            .iter()
            .find(|&&(p, _)| p == present)
            .map(|&(_, n)| n)
            .expect("not a present-state variable")
    }

    pub fn agent_id(&self, name: &str) -> Result<AgentId> {
        self.agent_index.get(name).copied().ok_or_else(|| Error::UnknownAgent(name.to_string()))
    }

    pub fn agent_name(&self, agent: AgentId) -> &str {
        &self.agents[agent].name
    }

    pub fn agent_observables(&self, agent: AgentId) -> &[u32] {
        &self.agents[agent].observables
    }

    pub fn agent_action_bits(&self, agent: AgentId) -> &[u32] {
        &self.agents[agent].action_bits
    }

    fn agents_in_group(&self, name: &str, out: &mut Vec<AgentId>) -> Result<()> {
        if let Some(members) = self.groups.get(name) {
            let members = members.clone();
            for member in &members {
                self.agents_in_group(member, out)?;
            }
        } else {
            let id = self.agent_id(name)?;
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Ok(())
    }

    /// Resolve a list of agent and group names into basic agents, preserving
    /// order and dropping duplicates.
    pub fn agents_in_list(&self, names: &[String]) -> Result<Vec<AgentId>> {
        let mut out = Vec::new();
        for name in names {
            self.agents_in_group(name, &mut out)?;
        }
        Ok(out)
    }

    pub fn label(&self, name: &str) -> Result<Ref> {
        self.labels.get(name).copied().ok_or_else(|| Error::UnknownAtom(name.to_string()))
    }

    fn present_to_next(&self) -> HashMap<u32, u32> {
        self.state_pairs.borrow().iter().map(|&(p, n)| (p, n)).collect()
    }
    fn next_to_present(&self) -> HashMap<u32, u32> {
        self.state_pairs.borrow().iter().map(|&(p, n)| (n, p)).collect()
    }
    fn all_present_vars(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.state_pairs.borrow().iter().map(|&(p, _)| p).collect();
        v.sort_unstable();
        v
    }
    pub(crate) fn all_next_vars(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.state_pairs.borrow().iter().map(|&(_, n)| n).collect();
        v.sort_unstable();
        v
    }

    pub(crate) fn to_next_states(&self, x: Ref) -> Ref {
        self.bdd.rename(x, &self.present_to_next())
    }

    /// Successors of `x` through the transition relation. Action variables of
    /// `x` constrain the transitions taken, so `post(states & moves)` is the
    /// image through the given moves only.
    pub fn post(&self, x: Ref) -> Ref {
        let b = self.bdd();
        let t = b.apply_and(x, self.trans);
        let present = self.all_present_vars();
        let quant = merge_sorted(&[present.as_slice(), self.input_vars.as_slice()]);
        let q = b.exists(t, &quant);
        b.apply_and(b.rename(q, &self.next_to_present()), self.states_mask)
    }

    /// States with some successor in `x` (action variables abstracted away).
    pub fn pre(&self, x: Ref) -> Ref {
        let b = self.bdd();
        let xs = b.apply_and(b.exists(x, &self.input_vars), self.states_mask);
        let xn = self.to_next_states(xs);
        let next = self.all_next_vars();
        let quant = merge_sorted(&[next.as_slice(), self.input_vars.as_slice()]);
        b.apply_and(b.exists(b.apply_and(self.trans, xn), &quant), self.states_mask)
    }

    /// Moves (state, joint action) with some successor in `x`.
    pub fn weak_pre(&self, x: Ref) -> Ref {
        let b = self.bdd();
        let xs = b.apply_and(b.exists(x, &self.input_vars), self.states_mask);
        let xn = self.to_next_states(xs);
        let quant = self.all_next_vars();
        b.apply_and(b.exists(b.apply_and(self.trans, xn), &quant), self.states_inputs_mask)
    }

    /// The states reachable from the initial states (memoized).
    pub fn reachable_states(&self) -> Ref {
        if let Some(r) = *self.reachable.borrow() {
            return r;
        }
        let b = self.bdd();
        let mut z = self.init;
        loop {
            let nz = b.apply_or(z, self.post(z));
            if nz == z {
                break;
            }
            z = nz;
        }
        debug!("reachable_states: {} states", self.count_states(z));
        *self.reachable.borrow_mut() = Some(z);
        z
    }

    /// The legal moves of a coalition: the global protocol with the other
    /// agents' actions abstracted away.
    pub fn protocol(&self, agents: &[AgentId]) -> Ref {
        let mut key = agents.to_vec();
        key.sort_unstable();
        if let Some(&r) = self.protocols.borrow().get(&key) {
            return r;
        }
        let b = self.bdd();
        let others = self.others_inputs_cube(agents);
        let r = b.apply_and(b.exists(self.protocol_all, &others), self.states_inputs_mask);
        self.protocols.borrow_mut().insert(key, r);
        r
    }

    /// States indistinguishable from some state of `x` under the joint
    /// (distributed) observation of `agents`.
    pub fn equivalent_states(&self, x: Ref, agents: &[AgentId]) -> Ref {
        let b = self.bdd();
        let obs: Vec<&[u32]> = agents.iter().map(|&a| self.agents[a].observables.as_slice()).collect();
        let obs = merge_sorted(&obs);
        let hidden: Vec<u32> =
            self.model_state_vars.iter().copied().filter(|v| !obs.contains(v)).collect();
        let quant = merge_sorted(&[hidden.as_slice(), self.input_vars.as_slice()]);
        b.apply_and(b.exists(x, &quant), self.states_mask)
    }

    pub fn pick_one_state_inputs(&self, x: Ref) -> Ref {
        self.bdd.pick_one(x, &self.model_si_vars)
    }
    pub fn pick_one_state(&self, x: Ref) -> Ref {
        self.bdd.pick_one(x, &self.model_state_vars)
    }
    pub fn pick_one_inputs(&self, x: Ref) -> Ref {
        self.bdd.pick_one(x, &self.input_vars)
    }

    pub fn pick_all_states(&self, x: Ref) -> Vec<Ref> {
        let b = self.bdd();
        let mut rest = b.apply_and(b.exists(x, &self.input_vars), self.states_mask);
        let mut out = Vec::new();
        while !b.is_zero(rest) {
            let s = self.pick_one_state(rest);
            rest = b.apply_diff(rest, s);
            out.push(s);
        }
        out
    }

    pub fn pick_all_states_inputs(&self, x: Ref) -> Vec<Ref> {
        let b = self.bdd();
        let mut rest = b.apply_and(x, self.states_inputs_mask);
        let mut out = Vec::new();
        while !b.is_zero(rest) {
            let si = self.pick_one_state_inputs(rest);
            rest = b.apply_diff(rest, si);
            out.push(si);
        }
        out
    }

    /// Number of model states in `x`.
    pub fn count_states(&self, x: Ref) -> BigUint {
        let xs = self.bdd.exists(x, &self.input_vars);
        self.bdd.sat_count(self.bdd.apply_and(xs, self.states_mask), &self.model_state_vars)
    }

    /// Readable `var=value` listing for a full state minterm.
    pub fn describe_state(&self, state: Ref) -> String {
        let b = self.bdd();
        let mut parts = Vec::new();
        for scalar in &self.scalars {
            for (i, value) in scalar.values.iter().enumerate() {
                let cube = value_cube(b, &scalar.bits, i);
                if !b.is_zero(b.apply_and(state, cube)) {
                    parts.push(format!("{}={}", scalar.name, value));
                    break;
                }
            }
        }
        parts.join(", ")
    }

    /// Readable `agent:action` listing for a full move minterm.
    pub fn describe_inputs(&self, si: Ref) -> String {
        let b = self.bdd();
        let mut parts = Vec::new();
        for agent in &self.agents {
            for (i, value) in agent.action_values.iter().enumerate() {
                let cube = value_cube(b, &agent.action_bits, i);
                if !b.is_zero(b.apply_and(si, cube)) {
                    parts.push(format!("{}:{}", agent.name, value));
                    break;
                }
            }
        }
        parts.join(", ")
    }

    /// Allocate `k` fresh (present, next) state-bit pairs on a new layer.
    ///
    /// Used by the symbolic strategy encoding; the pairs take part in
    /// present/next renaming from this point on.
    pub(crate) fn alloc_state_pairs(&self, k: usize) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(k);
        let mut counter = self.var_counter.get();
        for _ in 0..k {
            out.push((counter, counter + 1));
            counter += 2;
        }
        self.var_counter.set(counter);
        self.state_pairs.borrow_mut().extend(out.iter().copied());
        out
    }

    pub(crate) fn cached_fair(&self) -> Option<Ref> {
        *self.fair.borrow()
    }
    pub(crate) fn store_fair(&self, fair: Ref) {
        *self.fair.borrow_mut() = Some(fair);
    }

    pub(crate) fn eval_cache_lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.eval_cache.borrow().get(key).copied()
    }
    pub(crate) fn eval_cache_store(&self, key: CacheKey, entry: CacheEntry) {
        self.eval_cache.borrow_mut().insert(key, entry);
    }

    pub(crate) fn symbolic_store(&self) -> &RefCell<SymbolicStore> {
        &self.symbolic
    }

    /// Drop every memoized result attached to this system.
    ///
    /// Must be called by the owner when the system is conceptually reloaded;
    /// nothing invalidates these caches implicitly.
    pub fn reset_caches(&self) {
        *self.reachable.borrow_mut() = None;
        *self.fair.borrow_mut() = None;
        self.protocols.borrow_mut().clear();
        self.eval_cache.borrow_mut().clear();
        self.symbolic.borrow_mut().clear();
    }
}

/// Builder for [`MultiAgentSystem`].
pub struct MasBuilder {
    bdd: Rc<Bdd>,
    counter: u32,
    scalars: Vec<Scalar>,
    scalar_index: HashMap<String, usize>,
    agents: Vec<AgentData>,
    agent_index: HashMap<String, AgentId>,
    agent_protocols: Vec<Vec<Ref>>,
    groups: HashMap<String, Vec<String>>,
    init: Vec<Ref>,
    trans: Vec<Ref>,
    fairness: Vec<Ref>,
    labels: HashMap<String, Ref>,
}

impl Default for MasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MasBuilder {
    pub fn new() -> Self {
        Self {
            bdd: Rc::new(Bdd::new()),
            counter: 1,
            scalars: Vec::new(),
            scalar_index: HashMap::new(),
            agents: Vec::new(),
            agent_index: HashMap::new(),
            agent_protocols: Vec::new(),
            groups: HashMap::new(),
            init: Vec::new(),
            trans: Vec::new(),
            fairness: Vec::new(),
            labels: HashMap::new(),
        }
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    /// Shared handle to the manager, for building expressions while the
    /// builder is borrowed mutably.
    pub fn bdd_rc(&self) -> Rc<Bdd> {
        self.bdd.clone()
    }

    /// Declare a scalar state variable over the given value names.
    ///
    /// Allocates adjacent (present, next) bit pairs.
    pub fn state_var(&mut self, name: &str, values: &[&str]) -> ScalarVar {
        assert!(!self.scalar_index.contains_key(name), "duplicate state variable {name}");
        let k = bits_for(values.len());
        let mut bits = Vec::with_capacity(k);
        let mut next_bits = Vec::with_capacity(k);
        for _ in 0..k {
            bits.push(self.counter);
            next_bits.push(self.counter + 1);
            self.counter += 2;
        }
        let scalar = Scalar {
            name: name.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
            bits,
            next_bits,
        };
        self.scalar_index.insert(name.to_string(), self.scalars.len());
        self.scalars.push(scalar);
        ScalarVar(self.scalars.len() - 1)
    }

    /// Declare an agent with its action variable over the given value names.
    pub fn agent(&mut self, name: &str, actions: &[&str]) -> AgentId {
        assert!(!self.agent_index.contains_key(name), "duplicate agent {name}");
        let k = bits_for(actions.len());
        let mut action_bits = Vec::with_capacity(k);
        for _ in 0..k {
            action_bits.push(self.counter);
            self.counter += 1;
        }
        let agent = AgentData {
            name: name.to_string(),
            action_values: actions.iter().map(|s| s.to_string()).collect(),
            action_bits,
            observables: Vec::new(),
        };
        self.agent_index.insert(name.to_string(), self.agents.len());
        self.agents.push(agent);
        self.agent_protocols.push(Vec::new());
        self.agents.len() - 1
    }

    /// Make the given state variables observable to the agent.
    pub fn observes(&mut self, agent: AgentId, vars: &[ScalarVar]) {
        for &var in vars {
            self.agents[agent].observables.extend(self.scalars[var.0].bits.iter().copied());
        }
        self.agents[agent].observables.sort_unstable();
        self.agents[agent].observables.dedup();
    }

    /// Constrain the legal moves of an agent. Constraints accumulate by
    /// conjunction; the default protocol allows every action everywhere.
    ///
    /// For imperfect-information semantics to be meaningful, an agent's
    /// legal actions must depend only on variables it observes.
    pub fn protocol(&mut self, agent: AgentId, constraint: Ref) {
        self.agent_protocols[agent].push(constraint);
    }

    pub fn init(&mut self, constraint: Ref) {
        self.init.push(constraint);
    }

    /// Add a conjunct of the transition relation, over present, action and
    /// next variables.
    pub fn trans(&mut self, relation: Ref) {
        self.trans.push(relation);
    }

    pub fn fairness(&mut self, states: Ref) {
        self.fairness.push(states);
    }

    /// Register a named state set usable as an atom in formulas.
    pub fn label(&mut self, name: &str, states: Ref) {
        self.labels.insert(name.to_string(), states);
    }

    /// Declare a named group of agents (or nested groups).
    pub fn group(&mut self, name: &str, members: &[&str]) {
        self.groups.insert(name.to_string(), members.iter().map(|s| s.to_string()).collect());
    }

    /// Present-state equality `var = value`.
    pub fn eq(&self, var: ScalarVar, value: &str) -> Ref {
        let scalar = &self.scalars[var.0];
        let i = self.value_index(scalar, value);
        value_cube(&self.bdd, &scalar.bits, i)
    }

    /// Next-state equality `var' = value`.
    pub fn eq_next(&self, var: ScalarVar, value: &str) -> Ref {
        let scalar = &self.scalars[var.0];
        let i = self.value_index(scalar, value);
        value_cube(&self.bdd, &scalar.next_bits, i)
    }

    /// The relation `var' = var`.
    pub fn unchanged(&self, var: ScalarVar) -> Ref {
        let scalar = &self.scalars[var.0];
        let b = &self.bdd;
        let mut rel = b.one;
        for (&p, &n) in scalar.bits.iter().zip(&scalar.next_bits) {
            rel = b.apply_and(rel, b.apply_eq(b.mk_var(p), b.mk_var(n)));
        }
        rel
    }

    /// The relation `x' = y` between two scalars with the same domain.
    pub fn next_copies(&self, x: ScalarVar, y: ScalarVar) -> Ref {
        let sx = &self.scalars[x.0];
        let sy = &self.scalars[y.0];
        assert_eq!(sx.values, sy.values, "next_copies requires identical domains");
        let b = &self.bdd;
        let mut rel = b.zero;
        for value in &sx.values {
            rel = b.apply_or(rel, b.apply_and(self.eq_next(x, value), self.eq(y, value)));
        }
        rel
    }

    /// Action equality `agent.action = value`.
    pub fn action_eq(&self, agent: AgentId, value: &str) -> Ref {
        let data = &self.agents[agent];
        let i = data
            .action_values
            .iter()
            .position(|v| v == value)
            .unwrap_or_else(|| panic!("unknown action {value} for agent {}", data.name));
        value_cube(&self.bdd, &data.action_bits, i)
    }

    /// The relation `var' = value of the agent's action`, for a state scalar
    /// mirroring an action variable (used to expose past actions to
    /// fairness constraints).
    pub fn next_tracks_action(&self, var: ScalarVar, agent: AgentId) -> Ref {
        let scalar = &self.scalars[var.0];
        let data = &self.agents[agent];
        let b = &self.bdd;
        let mut rel = b.zero;
        for value in &data.action_values {
            let i = self.value_index(scalar, value);
            rel = b.apply_or(
                rel,
                b.apply_and(value_cube(b, &scalar.next_bits, i), self.action_eq(agent, value)),
            );
        }
        rel
    }

    fn value_index(&self, scalar: &Scalar, value: &str) -> usize {
        scalar
            .values
            .iter()
            .position(|v| v == value)
            .unwrap_or_else(|| panic!("unknown value {value} for variable {}", scalar.name))
    }

    pub fn build(self) -> MultiAgentSystem {
        let b = &self.bdd;

        let states_mask = b.apply_and_many(
            self.scalars.iter().map(|s| domain_mask(b, &s.bits, s.values.len())),
        );
        let next_states_mask = b.apply_and_many(
            self.scalars.iter().map(|s| domain_mask(b, &s.next_bits, s.values.len())),
        );
        let inputs_mask = b.apply_and_many(
            self.agents.iter().map(|a| domain_mask(b, &a.action_bits, a.action_values.len())),
        );
        let states_inputs_mask = b.apply_and(states_mask, inputs_mask);

        let protocol_all = {
            let per_agent = self
                .agent_protocols
                .iter()
                .map(|constraints| b.apply_and_many(constraints.iter().copied()));
            b.apply_and(b.apply_and_many(per_agent), states_inputs_mask)
        };

        let trans = {
            let base = b.apply_and_many(self.trans.iter().copied());
            b.apply_and(b.apply_and(base, protocol_all), next_states_mask)
        };

        let init = b.apply_and(b.apply_and_many(self.init.iter().copied()), states_mask);

        let state_pairs: Vec<(u32, u32)> = self
            .scalars
            .iter()
            .flat_map(|s| s.bits.iter().copied().zip(s.next_bits.iter().copied()))
            .collect();
        let model_state_vars = {
            let mut v: Vec<u32> = state_pairs.iter().map(|&(p, _)| p).collect();
            v.sort_unstable();
            v
        };
        let input_vars = {
            let mut v: Vec<u32> =
                self.agents.iter().flat_map(|a| a.action_bits.iter().copied()).collect();
            v.sort_unstable();
            v
        };
        let model_si_vars = merge_sorted(&[model_state_vars.as_slice(), input_vars.as_slice()]);

        MultiAgentSystem {
            bdd: self.bdd.clone(),
            scalars: self.scalars,
            agent_index: self.agent_index,
            agents: self.agents,
            groups: self.groups,
            labels: self.labels,
            state_pairs: RefCell::new(state_pairs),
            model_state_vars,
            model_si_vars,
            input_vars,
            var_counter: Cell::new(self.counter),
            init,
            trans,
            protocol_all,
            states_mask,
            inputs_mask,
            states_inputs_mask,
            fairness: self.fairness,
            reachable: RefCell::new(None),
            fair: RefCell::new(None),
            protocols: RefCell::new(HashMap::new()),
            eval_cache: RefCell::new(HashMap::new()),
            symbolic: RefCell::new(SymbolicStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// One boolean variable toggled by a single agent.
    fn toggle() -> (MultiAgentSystem, ScalarVar) {
        let mut builder = MasBuilder::new();
        let x = builder.state_var("x", &["off", "on"]);
        let a = builder.agent("switch", &["flip", "stay"]);
        builder.observes(a, &[x]);
        builder.init(builder.eq(x, "off"));
        let b_flip = builder.bdd().apply_and(
            builder.action_eq(a, "flip"),
            builder.bdd().apply_xor(builder.eq(x, "on"), builder.eq_next(x, "on")),
        );
        let b_stay = builder.bdd().apply_and(builder.action_eq(a, "stay"), builder.unchanged(x));
        builder.trans(builder.bdd().apply_or(b_flip, b_stay));
        builder.label("on", builder.eq(x, "on"));
        (builder.build(), x)
    }

    #[test]
    fn test_reachable() {
        let (mas, _) = toggle();
        let reach = mas.reachable_states();
        assert_eq!(mas.count_states(reach), 2u32.into());
    }

    #[test]
    fn test_post_pre() {
        let (mas, _) = toggle();
        let b = mas.bdd();
        let on = mas.label("on").unwrap();
        let off = b.apply_and(b.apply_not(on), mas.states_mask());
        // From off, both off (stay) and on (flip) are reachable in one step.
        assert_eq!(mas.post(off), b.apply_or(on, off));
        assert_eq!(mas.pre(on), b.apply_or(on, off));
        // weak_pre keeps the action: only flipping from off reaches on.
        let wp = mas.weak_pre(on);
        let flip_from_off = b.apply_and(off, b.apply_and(wp, mas.states_inputs_mask()));
        assert!(!b.is_zero(flip_from_off));
    }

    #[test]
    fn test_protocol_and_equivalence() {
        let (mas, _) = toggle();
        let b = mas.bdd();
        let agents = vec![0];
        let protocol = mas.protocol(&agents);
        // Two states, two actions each.
        assert_eq!(b.sat_count(protocol, mas.state_inputs_vars()), 4u32.into());
        // The switch observes x, so equivalence is identity on states.
        let on = mas.label("on").unwrap();
        assert_eq!(mas.equivalent_states(on, &agents), on);
    }

    #[test]
    fn test_unknown_names() {
        let (mas, _) = toggle();
        assert!(mas.agent_id("nobody").is_err());
        assert!(mas.label("nothing").is_err());
    }
}
