//! The naive strategy search: enumerate every maximal strategy of the
//! (possibly pre-filtered) protocol and collect the states each one wins.

use log::debug;

use crate::dispatch::Evaluator;
use crate::error::Result;
use crate::filter::{
    filter_cew, filter_cew_moves, filter_ceu, filter_ceu_moves, filter_cex, filter_cex_moves,
};
use crate::formula::Formula;
use crate::reference::Ref;
use crate::split::{all_equiv_sat, split};

pub(crate) fn eval_strat(ev: &Evaluator<'_>, formula: &Formula) -> Result<Ref> {
    let mas = ev.mas;
    let b = mas.bdd();
    let group = formula.coalition().expect("strategic formula");
    let agents = mas.agents_in_list(group)?;
    let protocol = mas.protocol(&agents);

    // Pre-filtering drops moves that provably cannot be extended to a
    // winning strategy, shrinking the subsequent enumeration.
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

    let mut sat = b.zero;
    let mut candidates = 0usize;
    for strat in split(mas, &agents, filtered) {
        let winning = match formula {
            Formula::CEX(_, phi) => {
                let sub = ev.eval(phi, None)?;
                filter_cex(mas, &agents, sub, strat)
            }
            Formula::CEU(_, p, q) => {
                let sub_1 = ev.eval(p, None)?;
                let sub_2 = ev.eval(q, None)?;
                filter_ceu(mas, &agents, sub_1, sub_2, strat)
            }
            Formula::CEW(_, p, q) => {
                let sub_1 = ev.eval(p, None)?;
                let sub_2 = ev.eval(q, None)?;
                filter_cew(mas, &agents, sub_1, sub_2, strat)
            }
            _ => unreachable!("eval_strat on a non-strategic formula"),
        };
        sat = b.apply_or(sat, all_equiv_sat(mas, &agents, winning));
        candidates += 1;
    }
    debug!("naive: {} examined {} candidate strategies", formula, candidates);
    Ok(sat)
}
