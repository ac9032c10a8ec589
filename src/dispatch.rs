//! Formula evaluation: recursive descent, operator rewriting, memoization
//! and dispatch of strategic operators to the selected search algorithm.
//!
//! Every non-strategic operator is either computed directly through the
//! symbolic algebra or rewritten into primitive form and re-evaluated; the
//! strategic kinds `CEX`/`CEU`/`CEW` are terminal and handed to the active
//! [`Implementation`].
//!
//! Evaluation runs in one of two modes. `naive` and `symbolic` evaluate over
//! the whole system and cache one `sat` set per formula. `partial`, `early`
//! and `backward` thread a `states` set of interest through the recursion and
//! cache a growing `(sat, unsat)` partition: each call only computes the
//! still-unclassified remainder and folds it back in.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::ctl;
use crate::epistemic;
use crate::error::{Error, Result};
use crate::formula::Formula;
use crate::mas::MultiAgentSystem;
use crate::reference::Ref;
use crate::{backward, early, naive, partial, symbolic};

/// Selector for the strategic-operator search algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Implementation {
    /// Enumerate every maximal strategy of the whole protocol.
    Naive,
    /// Grow partial strategies covering only the states of interest.
    Partial,
    /// Partial strategies with early win/loss classification.
    Early,
    /// Grow strategies backward from winning states. `CAU`, `CAF`, `CEW`
    /// and `CEG` are not supported.
    Backward,
    /// Compile the strategy space into extra state variables; no
    /// enumeration at all.
    Symbolic,
}

impl Implementation {
    pub const ALL: [Implementation; 5] = [
        Implementation::Naive,
        Implementation::Partial,
        Implementation::Early,
        Implementation::Backward,
        Implementation::Symbolic,
    ];

    /// Whether the algorithm threads a `states` restriction through the
    /// recursion.
    pub fn restricted(self) -> bool {
        matches!(self, Implementation::Partial | Implementation::Early | Implementation::Backward)
    }

    pub fn name(self) -> &'static str {
        match self {
            Implementation::Naive => "naive",
            Implementation::Partial => "partial",
            Implementation::Early => "early",
            Implementation::Backward => "backward",
            Implementation::Symbolic => "symbolic",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Implementation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naive" => Ok(Implementation::Naive),
            "partial" => Ok(Implementation::Partial),
            "early" => Ok(Implementation::Early),
            "backward" => Ok(Implementation::Backward),
            "symbolic" => Ok(Implementation::Symbolic),
            other => Err(Error::UnknownImplementation(other.to_string())),
        }
    }
}

pub(crate) type CacheKey = (Implementation, Formula);

/// One memoized result. Whole-system algorithms store the full `sat` set;
/// state-restricted ones store the partition accumulated so far.
#[derive(Debug, Copy, Clone)]
pub(crate) enum CacheEntry {
    Full(Ref),
    Partial { sat: Ref, unsat: Ref },
}

/// Evaluate `formula` over the whole system (or, for state-restricted
/// algorithms, over the initial states).
pub fn eval_atlk(
    mas: &MultiAgentSystem,
    formula: &Formula,
    implementation: Implementation,
    pre_filtering: bool,
) -> Result<Ref> {
    eval_atlk_within(mas, formula, None, implementation, pre_filtering)
}

/// Evaluate `formula`, restricting state-threading algorithms to `states`
/// (defaulting to the initial states). Whole-system algorithms ignore
/// `states`.
pub fn eval_atlk_within(
    mas: &MultiAgentSystem,
    formula: &Formula,
    states: Option<Ref>,
    implementation: Implementation,
    pre_filtering: bool,
) -> Result<Ref> {
    let evaluator = Evaluator { mas, implementation, pre_filtering };
    let states = if implementation.restricted() {
        Some(states.unwrap_or_else(|| mas.init()))
    } else {
        None
    };
    evaluator.eval(formula, states)
}

/// Whether the system satisfies the formula: no initial state may fall
/// outside the computed sat set.
pub fn check(
    mas: &MultiAgentSystem,
    formula: &Formula,
    implementation: Implementation,
    pre_filtering: bool,
) -> Result<bool> {
    let sat = eval_atlk(mas, formula, implementation, pre_filtering)?;
    let b = mas.bdd();
    let outside =
        b.apply_and(b.apply_and(b.apply_not(sat), mas.states_inputs_mask()), mas.init());
    let holds = b.is_zero(outside);
    debug!("check[{}] {} -> {}", implementation, formula, holds);
    Ok(holds)
}

pub(crate) struct Evaluator<'a> {
    pub mas: &'a MultiAgentSystem,
    pub implementation: Implementation,
    pub pre_filtering: bool,
}

impl Evaluator<'_> {
    /// Memoizing entry point; all recursion goes through here.
    pub fn eval(&self, formula: &Formula, states: Option<Ref>) -> Result<Ref> {
        let b = self.mas.bdd();
        let key = (self.implementation, formula.clone());
        match states {
            None => {
                if let Some(CacheEntry::Full(sat)) = self.mas.eval_cache_lookup(&key) {
                    return Ok(sat);
                }
                let sat = self.eval_raw(formula, None)?;
                self.mas.eval_cache_store(key, CacheEntry::Full(sat));
                Ok(sat)
            }
            Some(states) => {
                let (sat, unsat) = match self.mas.eval_cache_lookup(&key) {
                    Some(CacheEntry::Partial { sat, unsat }) => (sat, unsat),
                    _ => (b.zero, b.zero),
                };
                let remaining = b.apply_diff(states, b.apply_or(sat, unsat));
                if b.is_zero(remaining) {
                    return Ok(sat);
                }
                let remsat = self.eval_raw(formula, Some(remaining))?;
                let remunsat = b.apply_diff(remaining, remsat);
                // Operators returning unmasked complements (the CA* duals)
                // produce a superset of the satisfying states; only the part
                // inside `remaining` is actually decided, so only that part
                // may be folded into the partition.
                self.mas.eval_cache_store(
                    key,
                    CacheEntry::Partial {
                        sat: b.apply_or(sat, b.apply_and(remsat, remaining)),
                        unsat: b.apply_or(unsat, remunsat),
                    },
                );
                Ok(b.apply_or(sat, remsat))
            }
        }
    }

    /// Intersect a whole-system result with the states of interest, when any.
    fn narrow(&self, result: Ref, states: Option<Ref>) -> Ref {
        match states {
            None => result,
            Some(states) => self.mas.bdd().apply_and(result, states),
        }
    }

    fn unsupported(&self, formula: &Formula) -> Error {
        Error::UnsupportedOperator { formula: formula.to_string() }
    }

    fn eval_raw(&self, formula: &Formula, states: Option<Ref>) -> Result<Ref> {
        use Formula::*;
        let mas = self.mas;
        let b = mas.bdd();
        let backward_mode = self.implementation == Implementation::Backward;

        match formula {
            True => Ok(states.unwrap_or(b.one)),
            False => Ok(b.zero),
            Init => Ok(self.narrow(mas.init(), states)),
            Reachable => Ok(self.narrow(mas.reachable_states(), states)),
            Atom(name) => Ok(self.narrow(mas.label(name)?, states)),

            Not(phi) => {
                match states {
                    None => Ok(b.apply_not(self.eval(phi, None)?)),
                    Some(s) => Ok(b.apply_diff(s, self.eval(phi, Some(s))?)),
                }
            }
            And(p, q) => Ok(b.apply_and(self.eval(p, states)?, self.eval(q, states)?)),
            Or(p, q) => Ok(b.apply_or(self.eval(p, states)?, self.eval(q, states)?)),
            Implies(p, q) => {
                // p -> q  =  ~p | q
                let rewritten = p.as_ref().clone().not().or(q.as_ref().clone());
                self.eval(&rewritten, states)
            }
            Iff(p, q) => {
                // p <-> q  =  (p & q) | (~p & ~q)
                let p = p.as_ref().clone();
                let q = q.as_ref().clone();
                let rewritten = p.clone().and(q.clone()).or(p.not().and(q.not()));
                self.eval(&rewritten, states)
            }

            EX(phi) => {
                let sub = self.eval(phi, states.map(|s| mas.post(s)))?;
                Ok(self.narrow(ctl::ex(mas, sub), states))
            }
            AX(phi) => {
                // AX p = ~EX ~p
                let rewritten = phi.as_ref().clone().not().ex().not();
                self.eval(&rewritten, states)
            }
            EG(phi) => {
                let sub = self.eval(phi, states.map(|s| ctl::reach(mas, s)))?;
                Ok(self.narrow(ctl::eg(mas, sub), states))
            }
            AG(phi) => {
                // AG p = ~EF ~p
                let rewritten = phi.as_ref().clone().not().ef().not();
                self.eval(&rewritten, states)
            }
            EU(p, q) => {
                let sub_states = states.map(|s| ctl::reach(mas, s));
                let s1 = self.eval(p, sub_states)?;
                let s2 = self.eval(q, sub_states)?;
                Ok(ctl::eu(mas, s1, s2))
            }
            AU(p, q) => {
                // A[p U q] = ~(E[~q U ~p & ~q] | EG ~q)
                let p = p.as_ref().clone();
                let q = q.as_ref().clone();
                let rewritten = q
                    .clone()
                    .not()
                    .eu(p.not().and(q.clone().not()))
                    .or(q.not().eg())
                    .not();
                self.eval(&rewritten, states)
            }
            EF(phi) => {
                // EF p = E[true U p]
                let rewritten = Formula::True.eu(phi.as_ref().clone());
                self.eval(&rewritten, states)
            }
            AF(phi) => {
                // AF p = ~EG ~p
                let rewritten = phi.as_ref().clone().not().eg().not();
                self.eval(&rewritten, states)
            }
            EW(p, q) => {
                // E[p W q] = E[p U q] | EG p
                let p = p.as_ref().clone();
                let q = q.as_ref().clone();
                let rewritten = p.clone().eu(q).or(p.eg());
                self.eval(&rewritten, states)
            }
            AW(p, q) => {
                // A[p W q] = ~E[~q U ~p & ~q]
                let p = p.as_ref().clone();
                let q = q.as_ref().clone();
                let rewritten = q.clone().not().eu(p.not().and(q.not())).not();
                self.eval(&rewritten, states)
            }

            NK(agent, phi) => {
                let id = mas.agent_id(agent)?;
                let sub_states = states
                    .map(|s| b.apply_and(mas.equivalent_states(s, &[id]), mas.reachable_states()));
                let sub = self.eval(phi, sub_states)?;
                Ok(self.narrow(epistemic::nk(mas, id, sub), states))
            }
            K(agent, phi) => {
                // K<a> p = ~nK<a> ~p
                let rewritten = Formula::nk(agent, phi.as_ref().clone().not()).not();
                self.eval(&rewritten, states)
            }
            NE(group, phi) => {
                let agents = mas.agents_in_list(group)?;
                let sub_states = states.map(|s| epistemic::group_equiv(mas, &agents, s));
                let sub = self.eval(phi, sub_states)?;
                Ok(self.narrow(epistemic::ne(mas, &agents, sub), states))
            }
            E(group, phi) => {
                let rewritten = Formula::NE(group.clone(), Box::new(phi.as_ref().clone().not())).not();
                self.eval(&rewritten, states)
            }
            ND(group, phi) => {
                let agents = mas.agents_in_list(group)?;
                let sub_states = states.map(|s| epistemic::distributed_equiv(mas, &agents, s));
                let sub = self.eval(phi, sub_states)?;
                Ok(self.narrow(epistemic::nd(mas, &agents, sub), states))
            }
            D(group, phi) => {
                let rewritten = Formula::ND(group.clone(), Box::new(phi.as_ref().clone().not())).not();
                self.eval(&rewritten, states)
            }
            NC(group, phi) => {
                let agents = mas.agents_in_list(group)?;
                let sub_states = states.map(|s| epistemic::common_equiv(mas, &agents, s));
                let sub = self.eval(phi, sub_states)?;
                Ok(self.narrow(epistemic::nc(mas, &agents, sub), states))
            }
            C(group, phi) => {
                let rewritten = Formula::NC(group.clone(), Box::new(phi.as_ref().clone().not())).not();
                self.eval(&rewritten, states)
            }

            CAX(group, phi) => {
                // [g] X p = ~<g> X ~p
                let rewritten = Formula::CEX(group.clone(), Box::new(phi.as_ref().clone().not()));
                Ok(b.apply_not(self.eval(&rewritten, states)?))
            }
            CAG(group, phi) => {
                // [g] G p = ~<g> F ~p
                let rewritten = Formula::CEF(group.clone(), Box::new(phi.as_ref().clone().not()));
                Ok(b.apply_not(self.eval(&rewritten, states)?))
            }
            CAU(group, p, q) => {
                if backward_mode {
                    return Err(self.unsupported(formula));
                }
                // [g][p U q] = ~<g>[~q W ~p & ~q]
                let np = p.as_ref().clone().not();
                let nq = q.as_ref().clone().not();
                let rewritten = Formula::CEW(
                    group.clone(),
                    Box::new(nq.clone()),
                    Box::new(np.and(nq)),
                );
                Ok(b.apply_not(self.eval(&rewritten, states)?))
            }
            CAF(group, phi) => {
                if backward_mode {
                    return Err(self.unsupported(formula));
                }
                // [g] F p = ~<g> G ~p
                let rewritten = Formula::CEG(group.clone(), Box::new(phi.as_ref().clone().not()));
                Ok(b.apply_not(self.eval(&rewritten, states)?))
            }
            CAW(group, p, q) => {
                // [g][p W q] = ~<g>[~q U ~p & ~q]
                let np = p.as_ref().clone().not();
                let nq = q.as_ref().clone().not();
                let rewritten = Formula::CEU(
                    group.clone(),
                    Box::new(nq.clone()),
                    Box::new(np.and(nq)),
                );
                Ok(b.apply_not(self.eval(&rewritten, states)?))
            }
            CEG(group, phi) => {
                if backward_mode {
                    return Err(self.unsupported(formula));
                }
                // <g> G p = <g>[p W false]
                let rewritten = Formula::CEW(
                    group.clone(),
                    Box::new(phi.as_ref().clone()),
                    Box::new(Formula::False),
                );
                self.eval(&rewritten, states)
            }
            CEF(group, phi) => {
                // <g> F p = <g>[true U p]
                let rewritten = Formula::CEU(
                    group.clone(),
                    Box::new(Formula::True),
                    Box::new(phi.as_ref().clone()),
                );
                self.eval(&rewritten, states)
            }

            CEX(..) | CEU(..) => self.eval_strat(formula, states),
            CEW(..) => {
                if backward_mode {
                    return Err(self.unsupported(formula));
                }
                self.eval_strat(formula, states)
            }
        }
    }

    fn eval_strat(&self, formula: &Formula, states: Option<Ref>) -> Result<Ref> {
        debug!("eval_strat[{}]: {}", self.implementation, formula);
        match self.implementation {
            Implementation::Naive => naive::eval_strat(self, formula),
            Implementation::Symbolic => symbolic::eval_strat(self, formula),
            Implementation::Partial => {
                partial::eval_strat(self, formula, states.expect("restricted mode"))
            }
            Implementation::Early => {
                early::eval_strat(self, formula, states.expect("restricted mode"))
            }
            Implementation::Backward => {
                backward::eval_strat(self, formula, states.expect("restricted mode"))
            }
        }
    }
}
