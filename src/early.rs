//! The early-termination strategy search.
//!
//! Each candidate partial strategy is first closed under reachability and
//! compatibility, then states are classified at once: existential filtering
//! (`filter_ce*`) finds states no extension can win — lost outright — while
//! universal filtering (`filter_a*`) finds states every extension wins — won
//! outright. Only the undecided remainder is explored further, with the
//! candidate extended by compatible moves.

use log::debug;

use crate::ctl::reach;
use crate::dispatch::Evaluator;
use crate::error::Result;
use crate::filter::{
    filter_aw, filter_au, filter_ax, filter_cew, filter_cew_moves, filter_ceu, filter_ceu_moves,
    filter_cex, filter_cex_moves,
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

    let equiv_states = equiv_class(mas, &agents, states);

    let filtered = if ev.pre_filtering {
        let filtered = match formula {
            Formula::CEX(_, phi) => {
                let sub_states = post_through(mas, equiv_states, protocol);
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
        if b.is_zero(b.apply_and(equiv_states, filtered)) {
            return Ok(b.zero);
        }
        filtered
    } else {
        protocol
    };

    let mut equiv_states = b.exists(b.apply_and(equiv_states, filtered), mas.inputs_cube());

    let mut sat = b.zero;
    for strat in split(mas, &agents, b.apply_and(equiv_states, filtered)) {
        let win = eval_alt(ev, formula, &agents, equiv_states, strat, filtered)?;
        sat = b.apply_or(sat, b.apply_and(win, states));
        equiv_states = b.apply_diff(equiv_states, win);
        if b.is_zero(equiv_states) {
            break;
        }
    }
    Ok(sat)
}

/// Close a non-conflicting move set under reachability and compatibility:
/// keep adding protocol moves reachable from the set that agree with it on
/// indistinguishable states.
fn complete_compatible(mas: &MultiAgentSystem, agents: &[AgentId], moves: Ref) -> Ref {
    let b = mas.bdd();
    let protocol = mas.protocol(agents);
    let mut result = moves;
    loop {
        let new_states =
            b.apply_diff(post_through(mas, b.one, result), b.exists(result, mas.inputs_cube()));
        let new_moves =
            compatible_moves(mas, agents, b.apply_and(new_states, protocol), moves);
        if b.is_zero(new_moves) {
            return result;
        }
        result = b.apply_or(result, new_moves);
    }
}

/// The subset of `states` for which some extension of `strat` with moves of
/// `filtered` wins the formula.
fn eval_alt(
    ev: &Evaluator<'_>,
    formula: &Formula,
    agents: &[AgentId],
    states: Ref,
    strat: Ref,
    filtered: Ref,
) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();

    let completed = complete_compatible(mas, agents, strat);

    // Existential filtering: states some extension might still win.
    let notlose = match formula {
        Formula::CEX(_, phi) => {
            let sub_states = post_through(mas, equiv_class(mas, agents, states), completed);
            let sub = ev.eval(phi, Some(sub_states))?;
            filter_cex(mas, agents, sub, completed)
        }
        Formula::CEU(_, p, q) => {
            let completed_states = b.exists(completed, mas.inputs_cube());
            let sub_1 = ev.eval(p, Some(completed_states))?;
            let sub_2 = ev.eval(q, Some(completed_states))?;
            filter_ceu(mas, agents, sub_1, sub_2, completed)
        }
        Formula::CEW(_, p, q) => {
            let completed_states = b.exists(completed, mas.inputs_cube());
            let sub_1 = ev.eval(p, Some(completed_states))?;
            let sub_2 = ev.eval(q, Some(completed_states))?;
            filter_cew(mas, agents, sub_1, sub_2, completed)
        }
        _ => unreachable!("eval_alt on a non-strategic formula"),
    };
    let notlose = b.apply_and(notlose, states);
    let lose = b.apply_diff(states, all_equiv_sat(mas, agents, notlose));

    // Universal filtering: states every extension wins.
    let win = match formula {
        Formula::CEX(_, phi) => {
            let sub_states = post_through(mas, equiv_class(mas, agents, states), completed);
            let sub = ev.eval(phi, Some(sub_states))?;
            filter_ax(mas, agents, sub, completed)
        }
        Formula::CEU(_, p, q) => {
            let completed_states = b.exists(completed, mas.inputs_cube());
            let sub_1 = ev.eval(p, Some(completed_states))?;
            let sub_2 = ev.eval(q, Some(completed_states))?;
            filter_au(mas, agents, sub_1, sub_2, completed)
        }
        Formula::CEW(_, p, q) => {
            let completed_states = b.exists(completed, mas.inputs_cube());
            let sub_1 = ev.eval(p, Some(completed_states))?;
            let sub_2 = ev.eval(q, Some(completed_states))?;
            filter_aw(mas, agents, sub_1, sub_2, completed)
        }
        _ => unreachable!("eval_alt on a non-strategic formula"),
    };
    let win = all_equiv_sat(mas, agents, b.apply_and(win, states));

    if b.is_zero(b.apply_diff(states, b.apply_or(lose, win))) {
        return Ok(win);
    }

    let new_states =
        b.apply_diff(post_through(mas, b.one, strat), b.exists(strat, mas.inputs_cube()));
    let new_moves = b.apply_and(new_states, filtered);
    let compatible = compatible_moves(mas, agents, new_moves, strat);
    if b.is_zero(compatible) {
        // Nothing to extend with: the completed strategy already decides.
        debug!("eval_alt: no compatible extension for {}", formula);
        return Ok(b.apply_diff(states, lose));
    }

    let mut states = b.apply_diff(states, b.apply_or(lose, win));
    let mut win = win;
    for sub_strat in split(mas, agents, compatible) {
        let extended = b.apply_or(strat, sub_strat);
        win = b.apply_or(win, eval_alt(ev, formula, agents, states, extended, filtered)?);
        states = b.apply_diff(states, win);
        if b.is_zero(states) {
            break;
        }
    }
    Ok(win)
}
