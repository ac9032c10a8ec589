//! The partial strategy search: build candidate strategies incrementally,
//! splitting only moves reachable from the states of interest and extending
//! each candidate breadth-first until no further filtered moves are
//! reachable.

use log::debug;

use crate::ctl::reach;
use crate::dispatch::Evaluator;
use crate::error::Result;
use crate::filter::{
    filter_cew, filter_cew_moves, filter_ceu, filter_ceu_moves, filter_cex, filter_cex_moves,
};
use crate::formula::Formula;
use crate::mas::{AgentId, MultiAgentSystem};
use crate::reference::Ref;
use crate::split::{all_equiv_sat, compatible_moves, equiv_class, post_through, split};

pub(crate) fn eval_strat(ev: &Evaluator<'_>, formula: &Formula, states: Ref) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();
    let group = formula.coalition().expect("strategic formula");
    let agents = mas.agents_in_list(group)?;
    let protocol = mas.protocol(&agents);

    let filtered = if ev.pre_filtering {
        let filtered = match formula {
            Formula::CEX(_, phi) => {
                let sub_states = post_through(mas, equiv_class(mas, &agents, states), protocol);
                let sub = ev.eval(phi, Some(sub_states))?;
                filter_cex_moves(mas, &agents, sub, protocol)
            }
            Formula::CEU(_, p, q) => {
                let horizon = reach(mas, states);
                let sub_1 = ev.eval(p, Some(horizon))?;
                let sub_2 = ev.eval(q, Some(horizon))?;
                filter_ceu_moves(mas, &agents, sub_1, sub_2, protocol)
            }
            Formula::CEW(_, p, q) => {
                let horizon = reach(mas, states);
                let sub_1 = ev.eval(p, Some(horizon))?;
                let sub_2 = ev.eval(q, Some(horizon))?;
                filter_cew_moves(mas, &agents, sub_1, sub_2, protocol)
            }
            _ => unreachable!("eval_strat on a non-strategic formula"),
        };
        if b.is_zero(b.apply_and(states, filtered)) {
            return Ok(b.zero);
        }
        filtered
    } else {
        protocol
    };

    // Drop states that have no surviving move at all.
    let states = b.exists(b.apply_and(states, filtered), mas.inputs_cube());

    let mut sat = b.zero;
    let mut candidates = 0usize;
    for strat in
        partial_strategies_filtered(mas, &agents, equiv_class(mas, &agents, states), filtered)
    {
        if sat == states {
            debug!("partial: {} covered after {} candidates", formula, candidates);
            return Ok(sat);
        }
        let winning = match formula {
            Formula::CEX(_, phi) => {
                let sub_states = post_through(mas, equiv_class(mas, &agents, states), strat);
                let sub = ev.eval(phi, Some(sub_states))?;
                filter_cex(mas, &agents, sub, strat)
            }
            Formula::CEU(_, p, q) => {
                let strat_states = b.exists(strat, mas.inputs_cube());
                let sub_1 = ev.eval(p, Some(strat_states))?;
                let sub_2 = ev.eval(q, Some(strat_states))?;
                filter_ceu(mas, &agents, sub_1, sub_2, strat)
            }
            Formula::CEW(_, p, q) => {
                let strat_states = b.exists(strat, mas.inputs_cube());
                let sub_1 = ev.eval(p, Some(strat_states))?;
                let sub_2 = ev.eval(q, Some(strat_states))?;
                filter_cew(mas, &agents, sub_1, sub_2, strat)
            }
            _ => unreachable!("eval_strat on a non-strategic formula"),
        };
        sat = b.apply_or(sat, b.apply_and(all_equiv_sat(mas, &agents, winning), states));
        candidates += 1;
    }
    debug!("partial: {} examined {} candidate strategies", formula, candidates);
    Ok(sat)
}

/// Maximal non-conflicting extensions of `moves` with moves of `filtered`
/// reachable from it, breadth-first until nothing new is reachable.
fn reach_split_filtered<'a>(
    mas: &'a MultiAgentSystem,
    agents: &'a [AgentId],
    moves: Ref,
    filtered: Ref,
) -> Box<dyn Iterator<Item = Ref> + 'a> {
    let b = mas.bdd();
    let new_states =
        b.apply_diff(post_through(mas, b.one, moves), b.exists(moves, mas.inputs_cube()));
    let new_moves = b.apply_and(new_states, filtered);
    let compatible = compatible_moves(mas, agents, new_moves, moves);
    if b.is_zero(compatible) {
        return Box::new(std::iter::once(moves));
    }
    Box::new(split(mas, agents, compatible).flat_map(move |sub_strat| {
        reach_split_filtered(mas, agents, mas.bdd().apply_or(moves, sub_strat), filtered)
    }))
}

/// Non-conflicting subsets of `filtered` covering the given states and
/// closed under reachable compatible extension.
fn partial_strategies_filtered<'a>(
    mas: &'a MultiAgentSystem,
    agents: &'a [AgentId],
    states: Ref,
    filtered: Ref,
) -> Box<dyn Iterator<Item = Ref> + 'a> {
    let local = mas.bdd().apply_and(states, filtered);
    Box::new(
        split(mas, agents, local)
            .flat_map(move |nc_moves| reach_split_filtered(mas, agents, nc_moves, filtered)),
    )
}
