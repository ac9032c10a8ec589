//! Epistemic operators and the equivalence-class helpers they share with the
//! strategy-search algorithms.
//!
//! Group knowledge unions the individual indistinguishability relations,
//! distributed knowledge intersects them (joint observation), and common
//! knowledge closes group knowledge under iteration.

use crate::ctl::{fair_states, fixpoint};
use crate::mas::{AgentId, MultiAgentSystem};
use crate::reference::Ref;

/// Reachable states equivalent to some state of `states` for *some* agent of
/// the group.
pub fn group_equiv(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref) -> Ref {
    let b = mas.bdd();
    let mut res = b.zero;
    for &agent in agents {
        res = b.apply_or(
            res,
            b.apply_and(mas.equivalent_states(states, &[agent]), mas.reachable_states()),
        );
    }
    res
}

/// Reachable states equivalent to some state of `states` under the joint
/// observation of the whole group.
pub fn distributed_equiv(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref) -> Ref {
    let b = mas.bdd();
    b.apply_and(mas.equivalent_states(states, agents), mas.reachable_states())
}

/// Transitive closure of [`group_equiv`] over `states`.
pub fn common_equiv(mas: &MultiAgentSystem, agents: &[AgentId], states: Ref) -> Ref {
    let b = mas.bdd();
    fixpoint(|z| group_equiv(mas, agents, b.apply_or(states, z)), b.zero)
}

/// States where the agent considers possible a reachable fair `phi` state.
pub fn nk(mas: &MultiAgentSystem, agent: AgentId, phi: Ref) -> Ref {
    let b = mas.bdd();
    let witnesses = b.apply_and(phi, b.apply_and(mas.reachable_states(), fair_states(mas)));
    b.apply_and(mas.equivalent_states(witnesses, &[agent]), mas.reachable_states())
}

/// States where some agent of the group considers possible a `phi` state.
pub fn ne(mas: &MultiAgentSystem, agents: &[AgentId], phi: Ref) -> Ref {
    let b = mas.bdd();
    let mut res = b.zero;
    for &agent in agents {
        res = b.apply_or(res, nk(mas, agent, phi));
    }
    res
}

/// States where the group, pooling its observations, considers possible a
/// `phi` state.
pub fn nd(mas: &MultiAgentSystem, agents: &[AgentId], phi: Ref) -> Ref {
    let b = mas.bdd();
    let witnesses = b.apply_and(phi, b.apply_and(mas.reachable_states(), fair_states(mas)));
    b.apply_and(mas.equivalent_states(witnesses, agents), mas.reachable_states())
}

/// States reaching a `phi` state through a chain of single-agent
/// equivalences: the dual of common knowledge.
pub fn nc(mas: &MultiAgentSystem, agents: &[AgentId], phi: Ref) -> Ref {
    let b = mas.bdd();
    fixpoint(|z| ne(mas, agents, b.apply_or(phi, z)), b.zero)
}
