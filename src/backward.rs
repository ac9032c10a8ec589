//! The backward strategy search.
//!
//! Strategies grow backward from states already known to win: for `CEU`,
//! start from the moves of immediately-satisfying states, then repeatedly
//! add compatible moves whose successors all lie in the strategy built so
//! far, excluding rejected extensions so the recursion terminates.
//!
//! Only `CEX` and `CEU` (and the operators reducible to them) are supported;
//! the dispatcher rejects `CAU`, `CAF`, `CEW` and `CEG` beforehand.

use log::debug;

use crate::ctl::reach;
use crate::dispatch::Evaluator;
use crate::error::{Error, Result};
use crate::filter::{filter_ceu, pre_ce_moves};
use crate::formula::Formula;
use crate::mas::AgentId;
use crate::reference::Ref;
use crate::split::{all_equiv_sat, compatible_moves, equiv_class, post_through, split, split_all};

pub(crate) fn eval_strat(ev: &Evaluator<'_>, formula: &Formula, states: Ref) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();
    let group = formula.coalition().expect("strategic formula");
    let agents = mas.agents_in_list(group)?;

    match formula {
        Formula::CEX(_, phi) => {
            let mut equiv_states = equiv_class(mas, &agents, states);
            let sub = ev.eval(phi, Some(post_through(mas, equiv_states, b.one)))?;

            let target = pre_ce_moves(
                mas,
                &agents,
                b.apply_and(sub, mas.protocol(&agents)),
                b.one,
            );
            let mut sat = b.zero;
            for strat in split(mas, &agents, target) {
                let win = all_equiv_sat(mas, &agents, b.exists(strat, mas.inputs_cube()));
                sat = b.apply_or(sat, b.apply_and(win, equiv_states));
                equiv_states = b.apply_diff(equiv_states, sat);
                if b.is_zero(equiv_states) {
                    break;
                }
            }
            Ok(b.apply_and(sat, states))
        }

        Formula::CEU(_, p, q) => {
            let mut equiv_states = equiv_class(mas, &agents, states);
            let horizon = reach(mas, equiv_states);
            let sub_1 = ev.eval(p, Some(horizon))?;
            let sub_2 = ev.eval(q, Some(horizon))?;

            // States with an equivalent state outside sub_1 | sub_2 can
            // never be won.
            let unsat = b.apply_diff(
                equiv_states,
                all_equiv_sat(mas, &agents, b.apply_and(b.apply_or(sub_1, sub_2), equiv_states)),
            );
            equiv_states = b.apply_diff(equiv_states, unsat);
            if b.is_zero(equiv_states) {
                return Ok(equiv_states);
            }

            // States whose whole equivalence class is immediately winning.
            let mut sat = b.apply_and(
                all_equiv_sat(mas, &agents, b.apply_and(sub_2, equiv_states)),
                equiv_states,
            );
            if equiv_states == sat {
                return Ok(sat);
            }
            equiv_states = b.apply_diff(equiv_states, sat);

            let seeds = b.apply_and(sub_2, mas.protocol(&agents));
            for strat in split(mas, &agents, seeds) {
                sat = b.apply_or(
                    sat,
                    eval_backward_ceu(ev, &agents, strat, equiv_states, sub_1, b.zero)?,
                );
                equiv_states = b.apply_diff(equiv_states, sat);
                if b.is_zero(equiv_states) {
                    break;
                }
            }
            Ok(b.apply_and(sat, states))
        }

        _ => Err(Error::UnsupportedOperator { formula: formula.to_string() }),
    }
}

/// The subset of `states` won by some backward extension of `strat` through
/// `sub_1` states. `exclude` holds moves already rejected on this branch;
/// they are never proposed again, which bounds the recursion.
fn eval_backward_ceu(
    ev: &Evaluator<'_>,
    agents: &[AgentId],
    strat: Ref,
    states: Ref,
    sub_1: Ref,
    exclude: Ref,
) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();
    let protocol = mas.protocol(agents);

    let strat_states = b.exists(strat, mas.inputs_cube());

    let notlose = filter_ceu(mas, agents, sub_1, strat_states, protocol);
    let lose = b.apply_diff(states, b.apply_and(all_equiv_sat(mas, agents, notlose), states));
    let mut states = b.apply_diff(states, lose);
    if b.is_zero(states) {
        return Ok(states);
    }

    let win = b.apply_and(all_equiv_sat(mas, agents, strat_states), states);
    states = b.apply_diff(states, win);
    if b.is_zero(states) {
        return Ok(win);
    }

    let mut sat = win;

    let new_moves = b.apply_and(
        b.apply_diff(
            b.apply_and(
                pre_ce_moves(mas, agents, strat, b.apply_diff(protocol, exclude)),
                sub_1,
            ),
            strat,
        ),
        mas.states_inputs_mask(),
    );
    let compatible = compatible_moves(mas, agents, new_moves, strat);
    if b.is_zero(compatible) {
        debug!("backward: no compatible backward extension");
        return Ok(sat);
    }

    states = b.apply_diff(states, sat);

    for new_strat in split_all(mas, agents, compatible) {
        let extended = b.apply_or(strat, new_strat);
        let rejected = b.apply_or(exclude, b.apply_diff(new_moves, new_strat));
        sat = b.apply_or(sat, eval_backward_ceu(ev, agents, extended, states, sub_1, rejected)?);
        states = b.apply_diff(states, sat);
        if b.is_zero(states) {
            return Ok(sat);
        }
    }
    Ok(sat)
}
