//! The fully symbolic strategy search.
//!
//! Instead of enumerating strategies, the coalition's strategy space is
//! compiled into extra state variables: one choice variable per agent per
//! observation class of the filtered moves, ranging over the actions that
//! class allows. Three derived transition relations then answer the query
//! with a single nested-fixpoint formula:
//!
//! * `jump` — the original state stays, strategy variables are free:
//!   "there exists a strategy choice";
//! * `equiv` — the observations of some group member are equal and all
//!   strategy variables are kept: "for all indistinguishable states under
//!   the same strategy";
//! * `follow` — the original transition relation, with every group member
//!   obeying the strategy encoded in the current state.
//!
//! Compiled relations are cached on the system: the per-agent pieces are
//! keyed by `(agent, filtered moves)` so formulas sharing a filtered move
//! set reuse them.

use std::collections::HashMap;

use log::debug;

use crate::ctl::fixpoint;
use crate::dispatch::Evaluator;
use crate::error::Result;
use crate::filter::{filter_cew_moves, filter_ceu_moves, filter_cex_moves};
use crate::formula::Formula;
use crate::mas::{AgentId, MultiAgentSystem};
use crate::reference::Ref;

/// Compiled relations for one strategic formula.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Compiled {
    jump: Ref,
    equiv: Ref,
    follow: Ref,
}

/// Per-system cache of the strategy encoding.
#[derive(Debug, Default)]
pub(crate) struct SymbolicStore {
    jump: Option<Ref>,
    equiv: HashMap<AgentId, Ref>,
    /// (stay, followed) relations per agent and filtered move set.
    strategies: HashMap<(AgentId, Ref), (Ref, Ref)>,
    transitions: HashMap<(Formula, Ref), Compiled>,
}

impl SymbolicStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.jump = None;
        self.equiv.clear();
        self.strategies.clear();
        self.transitions.clear();
    }
}

pub(crate) fn eval_strat(ev: &Evaluator<'_>, formula: &Formula) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();
    let group = formula.coalition().expect("strategic formula");
    let agents = mas.agents_in_list(group)?;
    let protocol = mas.protocol(&agents);

    let filtered = if ev.pre_filtering {
        let filtered = match formula {
            Formula::CEX(_, phi) => {
                let sub = ev.eval(phi, None)?;
                filter_cex_moves(mas, &agents, sub, protocol)
            }
            Formula::CEU(_, p, q) => {
                let sub_1 = ev.eval(p, None)?;
                let sub_2 = ev.eval(q, None)?;
                filter_ceu_moves(mas, &agents, sub_1, sub_2, protocol)
            }
            Formula::CEW(_, p, q) => {
                let sub_1 = ev.eval(p, None)?;
                let sub_2 = ev.eval(q, None)?;
                filter_cew_moves(mas, &agents, sub_1, sub_2, protocol)
            }
            _ => unreachable!("eval_strat on a non-strategic formula"),
        };
        if b.is_zero(filtered) {
            return Ok(filtered);
        }
        filtered
    } else {
        protocol
    };

    let compiled = encode_strategies(mas, &agents, formula, filtered);

    let winning = match formula {
        Formula::CEX(_, phi) => {
            let sub = ev.eval(phi, None)?;
            eval_cex(mas, compiled, sub)
        }
        Formula::CEU(_, p, q) => {
            let sub_1 = ev.eval(p, None)?;
            let sub_2 = ev.eval(q, None)?;
            eval_ceu(mas, compiled, sub_1, sub_2)
        }
        Formula::CEW(_, p, q) => {
            let sub_1 = ev.eval(p, None)?;
            let sub_2 = ev.eval(q, None)?;
            eval_cew(mas, compiled, sub_1, sub_2)
        }
        _ => unreachable!("eval_strat on a non-strategic formula"),
    };

    Ok(b.apply_and(b.exists(winning, mas.inputs_cube()), mas.reachable_states()))
}

/// Compile (or fetch) the jump/equiv/follow relations for the formula's
/// coalition and filtered move set.
fn encode_strategies(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    formula: &Formula,
    filtered: Ref,
) -> Compiled {
    let b = mas.bdd();
    let mut store = mas.symbolic_store().borrow_mut();

    if store.jump.is_none() {
        store.jump = Some(jump_relation(mas));
    }

    for &agent in agents {
        if !store.strategies.contains_key(&(agent, filtered)) {
            let relations = strategy_relations(mas, agent, filtered);
            store.strategies.insert((agent, filtered), relations);
        }
        if !store.equiv.contains_key(&agent) {
            let relation = equivalence_relation(mas, agent);
            store.equiv.insert(agent, relation);
        }
    }

    let key = (formula.clone(), filtered);
    if let Some(&compiled) = store.transitions.get(&key) {
        return compiled;
    }

    let jump = store.jump.expect("jump relation was just compiled");

    // Observations of some member equal, every member's strategy kept.
    let mut equiv = b.zero;
    for &agent in agents {
        equiv = b.apply_or(equiv, store.equiv[&agent]);
    }
    for &agent in agents {
        equiv = b.apply_and(equiv, store.strategies[&(agent, filtered)].0);
    }

    // Original transitions, every member keeping and obeying its strategy.
    let mut follow = mas.trans();
    for &agent in agents {
        let (stay, followed) = store.strategies[&(agent, filtered)];
        follow = b.apply_and(follow, b.apply_and(stay, followed));
    }

    let compiled = Compiled { jump, equiv, follow };
    store.transitions.insert(key, compiled);
    debug!("symbolic: compiled relations for {}", formula);
    compiled
}

/// The original state variables stay equal; everything else is free.
fn jump_relation(mas: &MultiAgentSystem) -> Ref {
    let b = mas.bdd();
    let mut rel = b.one;
    for &p in mas.states_cube() {
        let n = mas.next_state_var(p);
        rel = b.apply_and(rel, b.apply_eq(b.mk_var(p), b.mk_var(n)));
    }
    rel
}

/// The agent's observed variables stay equal. Does not constrain strategy
/// variables.
fn equivalence_relation(mas: &MultiAgentSystem, agent: AgentId) -> Ref {
    let b = mas.bdd();
    let mut rel = b.one;
    for &p in mas.agent_observables(agent) {
        let n = mas.next_state_var(p);
        rel = b.apply_and(rel, b.apply_eq(b.mk_var(p), b.mk_var(n)));
    }
    rel
}

fn bits_for(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Allocate choice variables for the agent's observation classes in
/// `filtered` and return the (stay, followed) relations.
///
/// Bit patterns beyond the class's action count alias valid actions, so any
/// assignment of the choice variables denotes a real uniform strategy.
fn strategy_relations(mas: &MultiAgentSystem, agent: AgentId, filtered: Ref) -> (Ref, Ref) {
    let b = mas.bdd();
    let si_vars = mas.state_inputs_vars();
    let obs = mas.agent_observables(agent);
    let acts = mas.agent_action_bits(agent);

    let hidden: Vec<u32> = si_vars.iter().copied().filter(|v| !obs.contains(v)).collect();
    let non_action: Vec<u32> = si_vars.iter().copied().filter(|v| !acts.contains(v)).collect();

    let mut stay = b.one;
    let mut followed = b.one;
    let mut classes = 0usize;

    let mut work = b.apply_and(filtered, mas.states_inputs_mask());
    while !b.is_zero(work) {
        let si = b.pick_one(work, si_vars);
        let obs_cube = b.exists(si, &hidden);
        let class_moves = b.apply_and(work, obs_cube);

        // The actions the class allows the agent.
        let mut options = Vec::new();
        let mut inputs = b.exists(class_moves, &non_action);
        while !b.is_zero(inputs) {
            let action = b.pick_one(inputs, acts);
            options.push(action);
            inputs = b.apply_diff(inputs, action);
        }

        let k = bits_for(options.len());
        if k == 0 {
            // A single allowed action needs no choice variable.
            followed = b.apply_and(followed, b.apply_imply(obs_cube, options[0]));
        } else {
            let pairs = mas.alloc_state_pairs(k);
            for &(p, n) in &pairs {
                stay = b.apply_and(stay, b.apply_eq(b.mk_var(p), b.mk_var(n)));
            }
            for pattern in 0..1usize << k {
                let mut value = b.one;
                for (j, &(p, _)) in pairs.iter().enumerate() {
                    let x = b.mk_var(p);
                    value = b.apply_and(value, if pattern >> j & 1 == 1 { x } else { -x });
                }
                let action = options[pattern % options.len()];
                followed = b.apply_and(
                    followed,
                    b.apply_imply(b.apply_and(obs_cube, value), action),
                );
            }
        }

        classes += 1;
        work = b.apply_diff(work, obs_cube);
    }

    debug!(
        "symbolic: encoded {} observation classes for agent {}",
        classes,
        mas.agent_name(agent)
    );
    (stay, followed)
}

/// Pre-image through a compiled relation: states (over original and strategy
/// variables) with a related successor in `x`.
fn rel_pre(mas: &MultiAgentSystem, rel: Ref, x: Ref) -> Ref {
    let b = mas.bdd();
    let xs = b.exists(x, mas.inputs_cube());
    let xn = mas.to_next_states(xs);
    let mut quant = mas.all_next_vars();
    quant.extend_from_slice(mas.inputs_cube());
    quant.sort_unstable();
    b.exists(b.apply_and(rel, xn), &quant)
}

/// Universal pre-image: no related successor escapes `x`.
fn rel_box(mas: &MultiAgentSystem, rel: Ref, x: Ref) -> Ref {
    let b = mas.bdd();
    b.apply_not(rel_pre(mas, rel, b.apply_not(x)))
}

/// States whose encoded strategy cannot avoid violating fairness.
fn nfair(mas: &MultiAgentSystem, c: Compiled) -> Ref {
    let b = mas.bdd();
    if mas.fairness_constraints().is_empty() {
        return b.zero;
    }
    // μZ. ∨_fc [follow](νY. (Z ∨ ¬fc) ∧ [follow] Y)
    let inner = |z: Ref| {
        let mut res = b.zero;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_not(fc);
            let stay = fixpoint(
                |y| b.apply_and(b.apply_or(z, nfc), rel_box(mas, c.follow, y)),
                b.one,
            );
            res = b.apply_or(res, rel_box(mas, c.follow, stay));
        }
        res
    };
    fixpoint(inner, b.zero)
}

/// <group> X p  =  ⟨jump⟩ [equiv] (reachable ⇒ [follow] (p ∨ nfair)).
fn eval_cex(mas: &MultiAgentSystem, c: Compiled, states: Ref) -> Ref {
    let b = mas.bdd();
    let reachable = mas.reachable_states();
    let target = if mas.fairness_constraints().is_empty() {
        states
    } else {
        b.apply_or(states, nfair(mas, c))
    };
    let body = b.apply_imply(reachable, rel_box(mas, c.follow, target));
    rel_pre(mas, c.jump, rel_box(mas, c.equiv, body))
}

/// <group>[p U q] as a nested fixpoint over the compiled relations.
fn eval_ceu(mas: &MultiAgentSystem, c: Compiled, states_1: Ref, states_2: Ref) -> Ref {
    let b = mas.bdd();
    let reachable = mas.reachable_states();

    let body = if mas.fairness_constraints().is_empty() {
        // μZ. q ∨ (p ∧ [follow] Z)
        fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, rel_box(mas, c.follow, z))),
            b.zero,
        )
    } else {
        let nfair = nfair(mas, c);
        let p_q_n = b.apply_or(b.apply_or(states_1, states_2), nfair);
        // μZ. (p ∨ q ∨ nfair) ∧ (q ∨_fc [follow](νY. (Z ∨ ¬fc) ∧
        //     (p ∨ q ∨ nfair) ∧ (q ∨ [follow] Y)))
        let inner = |z: Ref| {
            let mut res = b.zero;
            for &fc in mas.fairness_constraints() {
                let fc = b.exists(fc, mas.inputs_cube());
                let nfc = b.apply_not(fc);
                let stay = fixpoint(
                    |y| {
                        b.apply_and(
                            b.apply_and(b.apply_or(z, nfc), p_q_n),
                            b.apply_or(states_2, rel_box(mas, c.follow, y)),
                        )
                    },
                    b.one,
                );
                res = b.apply_or(res, rel_box(mas, c.follow, stay));
            }
            b.apply_and(p_q_n, b.apply_or(states_2, res))
        };
        fixpoint(inner, b.zero)
    };

    let body = b.apply_imply(reachable, body);
    rel_pre(mas, c.jump, rel_box(mas, c.equiv, body))
}

/// <group>[p W q] as a nested fixpoint over the compiled relations.
fn eval_cew(mas: &MultiAgentSystem, c: Compiled, states_1: Ref, states_2: Ref) -> Ref {
    let b = mas.bdd();
    let reachable = mas.reachable_states();

    let body = if mas.fairness_constraints().is_empty() {
        // νZ. q ∨ (p ∧ [follow] Z)
        fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, rel_box(mas, c.follow, z))),
            b.one,
        )
    } else {
        let nfair = nfair(mas, c);
        let p_q_n = b.apply_or(b.apply_or(states_1, states_2), nfair);
        // νZ. (p ∨ q ∨ nfair) ∧ (q ∨ [follow] Z)
        fixpoint(
            |z| b.apply_and(p_q_n, b.apply_or(states_2, rel_box(mas, c.follow, z))),
            b.one,
        )
    };

    let body = b.apply_imply(reachable, body);
    rel_pre(mas, c.jump, rel_box(mas, c.equiv, body))
}
