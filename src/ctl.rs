//! Fair-CTL primitives over a multi-agent system.
//!
//! These are the non-strategic temporal operators the dispatcher delegates
//! to: existential next/until/weak-until restricted to fair paths, plus the
//! fixpoint and reachability helpers shared by the whole engine.

use log::trace;

use crate::mas::MultiAgentSystem;
use crate::reference::Ref;

/// Iterate `f` from `start` until stabilization.
///
/// Canonical BDD handles make the convergence test a handle comparison.
pub fn fixpoint(f: impl Fn(Ref) -> Ref, start: Ref) -> Ref {
    let mut z = start;
    loop {
        let nz = f(z);
        if nz == z {
            return z;
        }
        z = nz;
    }
}

/// States reachable from `states`: μZ. states ∨ post(Z).
pub fn reach(mas: &MultiAgentSystem, states: Ref) -> Ref {
    fixpoint(|z| mas.bdd().apply_or(states, mas.post(z)), mas.bdd().zero)
}

/// States lying on some fair path: νZ. ∧_fc pre(μY. (Z ∧ fc) ∨ pre(Y)).
///
/// The whole state space when there are no fairness constraints. Memoized on
/// the system.
pub fn fair_states(mas: &MultiAgentSystem) -> Ref {
    if let Some(fair) = mas.cached_fair() {
        return fair;
    }
    let b = mas.bdd();
    let fair = if mas.fairness_constraints().is_empty() {
        b.one
    } else {
        let inner = |z: Ref| {
            let mut res = b.one;
            for &fc in mas.fairness_constraints() {
                let fc = b.exists(fc, mas.inputs_cube());
                let stay = fixpoint(
                    |y| b.apply_or(b.apply_and(z, fc), mas.pre(y)),
                    b.zero,
                );
                res = b.apply_and(res, mas.pre(stay));
            }
            res
        };
        fixpoint(inner, b.one)
    };
    trace!("fair_states computed");
    mas.store_fair(fair);
    fair
}

/// States with a fair successor in `states`.
pub fn ex(mas: &MultiAgentSystem, states: Ref) -> Ref {
    mas.pre(mas.bdd().apply_and(states, fair_states(mas)))
}

/// Fair existential until: E[s1 U s2] over fair paths.
pub fn eu(mas: &MultiAgentSystem, s1: Ref, s2: Ref) -> Ref {
    let b = mas.bdd();
    let target = b.apply_and(s2, fair_states(mas));
    fixpoint(|y| b.apply_or(target, b.apply_and(s1, mas.pre(y))), b.zero)
}

/// Fair existential weak until: E[s1 W s2] over fair paths.
pub fn ew(mas: &MultiAgentSystem, s1: Ref, s2: Ref) -> Ref {
    let b = mas.bdd();
    if mas.fairness_constraints().is_empty() {
        return fixpoint(|z| b.apply_or(s2, b.apply_and(s1, mas.pre(z))), b.one);
    }
    let fair_s2 = b.apply_and(s2, fair_states(mas));
    let inner = |z: Ref| {
        let mut res = b.one;
        for &fc in mas.fairness_constraints() {
            let fc = b.exists(fc, mas.inputs_cube());
            let stay = fixpoint(
                |y| {
                    b.apply_or(
                        b.apply_or(fair_s2, b.apply_and(z, fc)),
                        b.apply_and(s1, mas.pre(y)),
                    )
                },
                b.zero,
            );
            res = b.apply_and(res, mas.pre(stay));
        }
        b.apply_or(b.apply_and(res, s1), fair_s2)
    };
    fixpoint(inner, b.one)
}

/// Fair existential globally: EG p = E[p W false].
pub fn eg(mas: &MultiAgentSystem, states: Ref) -> Ref {
    ew(mas, states, mas.bdd().zero)
}
