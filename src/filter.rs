//! The filter fixpoint operators.
//!
//! Given a *closed* move set for a coalition (a strategy or the whole
//! protocol), these compute the states — or, in the `_moves` variants, the
//! moves — from which the move set forces a temporal property along all fair
//! paths. `pre_ce` is the asymmetric pre-image at the heart of every filter:
//! the coalition picks an action such that, for every completion by the other
//! agents permitted by the move set, all successors qualify.
//!
//! The universal duals (`pre_univ`, `filter_ax/au/aw`) quantify over every
//! move the set permits instead; the `early` algorithm needs both sides to
//! classify states as surely-won or surely-lost before recursing.

use crate::ctl::fixpoint;
use crate::mas::{AgentId, MultiAgentSystem};
use crate::reference::Ref;

/// States with some coalition move in `moves` whose successors all lie in
/// `states`.
pub fn pre_ce(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    let others = mas.others_inputs_cube(agents);

    let states = b.exists(states, mas.inputs_cube());
    let states = b.apply_and(states, mas.states_mask());
    let nstates = b.apply_and(b.apply_not(states), mas.states_mask());
    let moves = b.apply_and(b.exists(moves, &others), mas.states_inputs_mask());

    // A coalition action qualifies when no completion leads outside states
    // and some completion is actually enabled.
    let bad = b.exists(mas.weak_pre(nstates), &others);
    let good = b.apply_and(b.apply_not(bad), mas.weak_pre(states));
    let good = b.exists(good, &others);
    b.exists(b.apply_and(good, moves), mas.inputs_cube())
}

/// νZ. states_2 ∨ (states_1 ∧ pre_ce(Z)).
pub fn stay_ce(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());
    fixpoint(
        |z| b.apply_or(states_2, b.apply_and(states_1, pre_ce(mas, agents, z, moves))),
        b.one,
    )
}

/// States from which the coalition, restricted to `moves`, cannot avoid
/// violating some fairness constraint.
pub fn nfair_ce(mas: &MultiAgentSystem, agents: &[AgentId], moves: Ref) -> Ref {
    let b = mas.bdd();
    if mas.fairness_constraints().is_empty() {
        return b.zero;
    }
    let inner = |z: Ref| {
        let mut res = b.zero;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let states = stay_ce(mas, agents, b.apply_or(z, nfc), b.zero, moves);
            res = b.apply_or(res, pre_ce(mas, agents, states, moves));
        }
        res
    };
    fixpoint(inner, b.zero)
}

/// States where some strategy within `moves` forces every fair path to have
/// its second state in `states`.
pub fn filter_cex(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    pre_ce(mas, agents, b.apply_or(states, nfair_ce(mas, agents, moves)), moves)
}

/// States where some strategy within `moves` forces every fair path to reach
/// `states_2` through `states_1`.
pub fn filter_ceu(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());

    if mas.fairness_constraints().is_empty() {
        // μZ. states_2 ∨ (states_1 ∧ pre_ce(Z))
        return fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, pre_ce(mas, agents, z, moves))),
            b.zero,
        );
    }

    let states_1_2_n = b.apply_or(
        b.apply_or(states_1, states_2),
        nfair_ce(mas, agents, moves),
    );
    let inner = |z: Ref| {
        let mut res = states_2;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let z_or_nfc = b.apply_or(z, nfc);
            let states = stay_ce(
                mas,
                agents,
                b.apply_and(states_1_2_n, z_or_nfc),
                b.apply_and(states_2, z_or_nfc),
                moves,
            );
            res = b.apply_or(res, pre_ce(mas, agents, states, moves));
        }
        b.apply_and(res, states_1_2_n)
    };
    fixpoint(inner, b.zero)
}

/// States where some strategy within `moves` forces every fair path to reach
/// `states_2` through `states_1` or stay in `states_1` forever.
pub fn filter_cew(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());

    if mas.fairness_constraints().is_empty() {
        // νZ. states_2 ∨ (states_1 ∧ pre_ce(Z))
        return fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, pre_ce(mas, agents, z, moves))),
            b.one,
        );
    }

    let states_1_2_n = b.apply_or(
        b.apply_or(states_1, states_2),
        nfair_ce(mas, agents, moves),
    );
    stay_ce(mas, agents, states_1_2_n, states_2, moves)
}

// ----- moves-space filters, used for pre-filtering --------------------------

/// Moves with some coalition action all of whose successors have a move in
/// `target`.
pub fn pre_ce_moves(mas: &MultiAgentSystem, agents: &[AgentId], target: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    let others = mas.others_inputs_cube(agents);

    let states = b.exists(target, mas.inputs_cube());
    let states = b.apply_and(states, mas.states_mask());
    let nstates = b.apply_and(b.apply_not(states), mas.states_mask());
    let moves = b.apply_and(b.exists(moves, &others), mas.states_inputs_mask());

    let bad = b.exists(mas.weak_pre(nstates), &others);
    let good = b.apply_and(b.apply_not(bad), mas.weak_pre(states));
    let good = b.exists(good, &others);
    b.exists(b.apply_and(good, moves), &others)
}

/// νZ. moves_2 ∨ (moves_1 ∧ pre_ce_moves(Z)).
pub fn stay_ce_moves(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    moves_1: Ref,
    moves_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let others = mas.others_inputs_cube(agents);
    let moves_1 = b.apply_and(b.exists(moves_1, &others), mas.states_inputs_mask());
    let moves_2 = b.apply_and(b.exists(moves_2, &others), mas.states_inputs_mask());
    fixpoint(
        |z| b.apply_or(moves_2, b.apply_and(moves_1, pre_ce_moves(mas, agents, z, moves))),
        b.one,
    )
}

pub fn nfair_ce_moves(mas: &MultiAgentSystem, agents: &[AgentId], moves: Ref) -> Ref {
    let b = mas.bdd();
    if mas.fairness_constraints().is_empty() {
        return b.zero;
    }
    let inner = |z: Ref| {
        let mut res = b.zero;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let nfc_moves = b.apply_and(nfc, b.apply_and(mas.protocol(agents), moves));
            let m = stay_ce_moves(mas, agents, b.apply_or(z, nfc_moves), b.zero, moves);
            res = b.apply_or(res, pre_ce_moves(mas, agents, m, moves));
        }
        res
    };
    fixpoint(inner, b.zero)
}

/// Moves that can be part of a strategy forcing `target` at the next step.
pub fn filter_cex_moves(mas: &MultiAgentSystem, agents: &[AgentId], target: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    let goal = b.apply_or(
        b.apply_and(target, mas.protocol(agents)),
        nfair_ce_moves(mas, agents, moves),
    );
    pre_ce_moves(mas, agents, goal, moves)
}

/// Moves that can be part of a strategy forcing `moves_1 U moves_2`.
pub fn filter_ceu_moves(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    moves_1: Ref,
    moves_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(moves_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(moves_2, mas.inputs_cube()), mas.states_mask());
    let moves_1 = b.apply_and(states_1, mas.protocol(agents));
    let moves_2 = b.apply_and(states_2, mas.protocol(agents));

    if mas.fairness_constraints().is_empty() {
        // μZ. moves_2 ∧ moves ∨ (moves_1 ∧ moves ∧ pre_ce_moves(Z))
        return fixpoint(
            |z| {
                b.apply_or(
                    b.apply_and(moves_2, moves),
                    b.apply_and(
                        b.apply_and(moves_1, moves),
                        pre_ce_moves(mas, agents, z, moves),
                    ),
                )
            },
            b.zero,
        );
    }

    let moves_1_2_n = b.apply_and(
        b.apply_or(b.apply_or(moves_1, moves_2), nfair_ce_moves(mas, agents, moves)),
        moves,
    );
    let inner = |z: Ref| {
        let mut res = b.apply_and(moves_2, moves);
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let moves_nfc = b.apply_and(nfc, b.apply_and(mas.protocol(agents), moves));
            let m = stay_ce_moves(
                mas,
                agents,
                b.apply_and(moves_1_2_n, b.apply_or(z, moves_nfc)),
                b.apply_and(b.apply_and(moves_2, moves), b.apply_or(z, moves_nfc)),
                moves,
            );
            res = b.apply_or(res, pre_ce_moves(mas, agents, m, moves));
        }
        b.apply_and(res, moves_1_2_n)
    };
    fixpoint(inner, b.zero)
}

/// Moves that can be part of a strategy forcing `moves_1 W moves_2`.
pub fn filter_cew_moves(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    moves_1: Ref,
    moves_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(moves_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(moves_2, mas.inputs_cube()), mas.states_mask());
    let moves_1 = b.apply_and(states_1, mas.protocol(agents));
    let moves_2 = b.apply_and(states_2, mas.protocol(agents));

    if mas.fairness_constraints().is_empty() {
        return fixpoint(
            |z| {
                b.apply_or(
                    b.apply_and(moves_2, moves),
                    b.apply_and(
                        b.apply_and(moves_1, moves),
                        pre_ce_moves(mas, agents, z, moves),
                    ),
                )
            },
            b.one,
        );
    }

    let moves_1_2_n = b.apply_and(
        b.apply_or(b.apply_or(moves_1, moves_2), nfair_ce_moves(mas, agents, moves)),
        moves,
    );
    stay_ce_moves(mas, agents, moves_1_2_n, b.apply_and(states_2, moves), moves)
}

// ----- universal filters, used by the early algorithm -----------------------

/// States where every move of `moves` that specifies a coalition action leads
/// only into `states`.
pub fn pre_univ(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    let others = mas.others_inputs_cube(agents);

    let states = b.exists(states, mas.inputs_cube());
    let states = b.apply_and(states, mas.states_mask());
    let nstates = b.apply_and(b.apply_not(states), mas.states_mask());
    let moves = b.apply_and(b.exists(moves, &others), mas.states_inputs_mask());

    let escaping = b.apply_and(
        b.exists(b.apply_and(mas.weak_pre(nstates), moves), mas.inputs_cube()),
        mas.states_mask(),
    );
    b.apply_and(b.apply_not(escaping), b.exists(moves, mas.inputs_cube()))
}

/// νZ. states_2 ∨ (states_1 ∧ pre_univ(Z)).
pub fn stay_univ(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());
    fixpoint(
        |z| b.apply_or(states_2, b.apply_and(states_1, pre_univ(mas, agents, z, moves))),
        b.one,
    )
}

pub fn nfair_univ(mas: &MultiAgentSystem, agents: &[AgentId], moves: Ref) -> Ref {
    let b = mas.bdd();
    if mas.fairness_constraints().is_empty() {
        return b.zero;
    }
    let inner = |z: Ref| {
        let mut res = b.zero;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let states = stay_univ(mas, agents, b.apply_or(z, nfc), b.zero, moves);
            res = b.apply_or(res, pre_univ(mas, agents, states, moves));
        }
        res
    };
    fixpoint(inner, b.zero)
}

/// States where every fair path through `moves` has its second state in
/// `states`.
pub fn filter_ax(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref, moves: Ref) -> Ref {
    let b = mas.bdd();
    pre_univ(mas, agents, b.apply_or(states, nfair_univ(mas, agents, moves)), moves)
}

/// States where every fair path through `moves` reaches `states_2` through
/// `states_1`.
pub fn filter_au(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());

    if mas.fairness_constraints().is_empty() {
        return fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, pre_univ(mas, agents, z, moves))),
            b.zero,
        );
    }

    let states_1_2_n = b.apply_or(
        b.apply_or(states_1, states_2),
        nfair_univ(mas, agents, moves),
    );
    let inner = |z: Ref| {
        let mut res = states_2;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let nfc = b.apply_and(b.apply_not(fc), mas.states_mask());
            let z_or_nfc = b.apply_or(z, nfc);
            let states = stay_univ(
                mas,
                agents,
                b.apply_and(states_1_2_n, z_or_nfc),
                b.apply_and(states_2, z_or_nfc),
                moves,
            );
            res = b.apply_or(res, pre_univ(mas, agents, states, moves));
        }
        b.apply_and(res, states_1_2_n)
    };
    fixpoint(inner, b.zero)
}

/// States where every fair path through `moves` reaches `states_2` through
/// `states_1` or stays in `states_1` forever.
pub fn filter_aw(
    mas: &MultiAgentSystem,
    agents: &[AgentId],
    states_1: Ref,
    states_2: Ref,
    moves: Ref,
) -> Ref {
    let b = mas.bdd();
    let states_1 = b.apply_and(b.exists(states_1, mas.inputs_cube()), mas.states_mask());
    let states_2 = b.apply_and(b.exists(states_2, mas.inputs_cube()), mas.states_mask());

    if mas.fairness_constraints().is_empty() {
        return fixpoint(
            |z| b.apply_or(states_2, b.apply_and(states_1, pre_univ(mas, agents, z, moves))),
            b.one,
        );
    }

    let states_1_2_n = b.apply_or(
        b.apply_or(states_1, states_2),
        nfair_univ(mas, agents, moves),
    );
    stay_univ(mas, agents, states_1_2_n, states_2, moves)
}
