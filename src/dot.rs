//! Graphviz rendering of a system with a highlighted move set.
//!
//! Diagnostic helper: dumps the reachable fragment of a system as a `dot`
//! digraph, painting red the states and transitions covered by the given
//! moves. Useful when a strategy search returns something surprising.

use std::collections::HashMap;

use crate::mas::MultiAgentSystem;
use crate::reference::Ref;

/// Render the reachable states and transitions of `mas`, highlighting the
/// states and transitions of `moves`.
pub fn moves_to_dot(mas: &MultiAgentSystem, moves: Ref) -> String {
    let b = mas.bdd();
    let states = mas.pick_all_states(mas.reachable_states());
    let move_states = b.exists(moves, mas.inputs_cube());
    let protocol = mas.protocol(&mas.all_agents());

    let ids: HashMap<Ref, String> =
        states.iter().enumerate().map(|(i, &s)| (s, format!("s{}", i + 1))).collect();

    let mut dot = vec!["digraph {".to_string()];

    for &state in &states {
        let mut attrs = vec![format!("label=\"{}\"", mas.describe_state(state).replace(", ", "\\n"))];
        if !b.is_zero(b.apply_and(state, mas.init())) {
            attrs.push("penwidth=5".to_string());
        }
        if !b.is_zero(b.apply_and(state, move_states)) {
            attrs.push("color=\"red\"".to_string());
        }
        dot.push(format!("{} [{}]", ids[&state], attrs.join(", ")));
    }

    for &state in &states {
        for si in mas.pick_all_states_inputs(b.apply_and(state, protocol)) {
            let highlighted = b.is_zero(b.apply_diff(si, moves));
            for succ in mas.pick_all_states(mas.post(si)) {
                let Some(target) = ids.get(&succ) else {
                    continue;
                };
                let mut attrs =
                    vec![format!("label=\"{}\"", mas.describe_inputs(si).replace(", ", "\\n"))];
                if highlighted {
                    attrs.push("color=\"red\"".to_string());
                }
                dot.push(format!("{} -> {} [{}]", ids[&state], target, attrs.join(", ")));
            }
        }
    }

    dot.push("}".to_string());
    dot.join("\n")
}
