//! The split combinatorial search.
//!
//! `split` enumerates all maximal non-conflicting subsets of a coalition move
//! set: candidate strategies in which no agent assigns different actions to
//! states it cannot distinguish. Enumeration is lazy — consumers break out as
//! soon as the remaining states of interest are covered — and the union of
//! every yielded strategy equals the input move set.
//!
//! `split_all` is the variant used by the backward search: it drops the
//! common-prefix bookkeeping (coverage of the input set does not matter
//! there, since strategies are grown incrementally) and deduplicates yields
//! instead.

use std::collections::HashSet;
use std::iter;

use log::trace;

use crate::mas::{AgentId, MultiAgentSystem};
use crate::reference::Ref;

/// The equivalence class of `states` for the group: every reachable state
/// some member of the group cannot tell apart from a state of `states`.
pub fn equiv_class(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref) -> Ref {
    let b = mas.bdd();
    let mut res = states;
    for &agent in agents {
        res = b.apply_or(
            res,
            b.apply_and(mas.equivalent_states(states, &[agent]), mas.reachable_states()),
        );
    }
    res
}

fn observation_cube(mas: &MultiAgentSystem, agent: AgentId) -> Vec<u32> {
    // Everything the agent cannot see: the full state cube plus the other
    // agents' actions. Quantifying a move over this cube leaves the agent's
    // own action only.
    let mut cube: Vec<u32> = mas.states_cube().to_vec();
    cube.extend(mas.others_inputs_cube(&[agent]));
    cube.sort_unstable();
    cube
}

/// Whether an equivalence class of moves assigns different actions to the
/// agent in indistinguishable states.
pub fn is_conflicting(mas: &MultiAgentSystem, agent: AgentId, eqclass: Ref) -> bool {
    let b = mas.bdd();
    let si = mas.pick_one_state_inputs(eqclass);
    let same_action = b.apply_and(eqclass, b.exists(si, &observation_cube(mas, agent)));
    !b.is_zero(b.apply_diff(eqclass, same_action))
}

/// Partition a conflicting equivalence class into its maximal
/// non-conflicting subsets, one per action of the agent.
pub fn split_conflicting(mas: &MultiAgentSystem, agent: AgentId, mut eqclass: Ref) -> Vec<Ref> {
    let b = mas.bdd();
    let cube = observation_cube(mas, agent);
    let mut out = Vec::new();
    while !b.is_zero(eqclass) {
        let si = mas.pick_one_state_inputs(eqclass);
        let ncss = b.apply_and(eqclass, b.exists(si, &cube));
        eqclass = b.apply_diff(eqclass, ncss);
        out.push(ncss);
    }
    out
}

/// Process equivalence classes of `moves` for the agent until the first
/// conflicting one, returning (common prefix, split, rest) triples — one per
/// way of resolving the conflict.
fn split_one(mas: &MultiAgentSystem, agent: AgentId, mut moves: Ref) -> Vec<(Ref, Ref, Ref)> {
    let b = mas.bdd();
    if b.is_zero(moves) {
        return vec![(moves, moves, moves)];
    }
    let mut common = b.zero;
    while !b.is_zero(moves) {
        let si = mas.pick_one_state_inputs(moves);
        let s = b.exists(si, mas.inputs_cube());
        let eqs = equiv_class(mas, &[agent], s);
        let eqcl = b.apply_and(moves, eqs);
        moves = b.apply_diff(moves, eqcl);

        if is_conflicting(mas, agent, eqcl) {
            return split_conflicting(mas, agent, eqcl)
                .into_iter()
                .map(|nc| (common, nc, moves))
                .collect();
        }
        common = b.apply_or(common, eqcl);
    }
    // No conflict found, everything is in common.
    vec![(common, moves, moves)]
}

/// All maximal subsets of `moves` that are non-conflicting for the agent.
pub fn split_agent(
    mas: &MultiAgentSystem,
    agent: AgentId,
    moves: Ref,
) -> Box<dyn Iterator<Item = Ref> + '_> {
    if mas.bdd().is_zero(moves) {
        return Box::new(iter::once(moves));
    }
    Box::new(split_one(mas, agent, moves).into_iter().flat_map(move |(common, nc, rest)| {
        split_agent(mas, agent, rest).map(move |strat| {
            let b = mas.bdd();
            b.apply_or(b.apply_or(common, nc), strat)
        })
    }))
}

/// All maximal non-conflicting subsets of `moves` for the coalition,
/// processed one agent at a time.
pub fn split<'a>(
    mas: &'a MultiAgentSystem,
    agents: &'a [AgentId],
    moves: Ref,
) -> Box<dyn Iterator<Item = Ref> + 'a> {
    match agents.split_first() {
        None => Box::new(iter::once(moves)),
        Some((&agent, others)) => {
            trace!("split: agent {} over {}", mas.agent_name(agent), moves);
            Box::new(
                split(mas, others, moves).flat_map(move |strat| split_agent(mas, agent, strat)),
            )
        }
    }
}

fn split_one_all(mas: &MultiAgentSystem, agent: AgentId, mut moves: Ref) -> Vec<(Ref, Ref)> {
    let b = mas.bdd();
    if b.is_zero(moves) {
        return vec![(moves, moves)];
    }
    let si = mas.pick_one_state_inputs(moves);
    let s = b.exists(si, mas.inputs_cube());
    let eqs = equiv_class(mas, &[agent], s);
    let eqcl = b.apply_and(moves, eqs);
    moves = b.apply_diff(moves, eqcl);

    let mut out: Vec<(Ref, Ref)> = split_conflicting(mas, agent, eqcl)
        .into_iter()
        .map(|nc| (nc, moves))
        .collect();
    out.push((b.zero, moves));
    out
}

fn split_agent_all(
    mas: &MultiAgentSystem,
    agent: AgentId,
    moves: Ref,
) -> Box<dyn Iterator<Item = Ref> + '_> {
    if mas.bdd().is_zero(moves) {
        return Box::new(iter::once(moves));
    }
    Box::new(split_one_all(mas, agent, moves).into_iter().flat_map(move |(nc, rest)| {
        split_agent_all(mas, agent, rest).map(move |strat| mas.bdd().apply_or(nc, strat))
    }))
}

/// All non-conflicting subsets of `moves` for the coalition, maximal or not,
/// without the common-prefix tracking of [`split`]. Duplicate yields are
/// suppressed.
pub fn split_all<'a>(
    mas: &'a MultiAgentSystem,
    agents: &'a [AgentId],
    moves: Ref,
) -> Box<dyn Iterator<Item = Ref> + 'a> {
    match agents.split_first() {
        None => Box::new(iter::once(moves)),
        Some((&agent, others)) => {
            let mut seen = HashSet::from([mas.bdd().zero]);
            Box::new(
                split_all(mas, others, moves)
                    .flat_map(move |strat| split_agent_all(mas, agent, strat))
                    .filter(move |&strat| seen.insert(strat)),
            )
        }
    }
}

// ----- shared helpers --------------------------------------------------------

/// The subset of `states` all of whose group-equivalent reachable states are
/// also in `states`.
pub fn all_equiv_sat(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref) -> Ref {
    let b = mas.bdd();
    let mut equiv_sat = states;
    let missing = b.apply_and(b.apply_not(states), mas.states_inputs_mask());
    for &agent in agents {
        let outside = b.apply_and(missing, mas.reachable_states());
        let spoiled = mas.equivalent_states(outside, &[agent]);
        equiv_sat = b.apply_and(equiv_sat, b.apply_and(b.apply_not(spoiled), states));
    }
    equiv_sat
}

/// States reachable from `states` in one step through the given moves.
pub fn post_through(mas: &MultiAgentSystem, states: Ref, moves: Ref) -> Ref {
    mas.post(mas.bdd().apply_and(states, moves))
}

/// The subset of `moves` that no agent of the coalition plays differently
/// from `filtered` on states it cannot distinguish.
pub fn compatible_moves(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    moves: Ref,
    filtered: Ref,
) -> Ref {
    let mut moves = moves;
    for &agent in agents {
        moves = compatible_moves_for_agent(mas, agent, moves, filtered);
    }
    moves
}

fn compatible_moves_for_agent(
    mas: &MultiAgentSystem,
    agent: AgentId,
    mut moves: Ref,
    filtered: Ref,
) -> Ref {
    let b = mas.bdd();
    let cube = observation_cube(mas, agent);

    let mut compatible = b.zero;
    while !b.is_zero(moves) {
        let si = mas.pick_one_state_inputs(moves);
        let s = b.exists(si, mas.inputs_cube());
        let eqs = equiv_class(mas, &[agent], s);

        let eqcl = b.apply_and(moves, eqs);
        moves = b.apply_diff(moves, eqcl);

        if b.is_zero(b.apply_and(eqs, filtered)) {
            // The class is untouched by filtered, any action is fine.
            compatible = b.apply_or(compatible, eqcl);
        } else {
            // Keep only the action filtered already fixes for this class.
            let agent_action = b.exists(b.apply_and(filtered, eqs), &cube);
            compatible = b.apply_or(compatible, b.apply_and(eqcl, agent_action));
        }
    }
    compatible
}
