//! Cross-cutting properties of the engine: split coverage, filter
//! monotonicity, derived-operator dualities, negation idempotence and cache
//! transparency.

mod common;

use std::str::FromStr;

use atlk_rs::filter::{filter_cew, filter_ceu};
use atlk_rs::split::{equiv_class, is_conflicting, split};
use atlk_rs::{eval_atlk, eval_atlk_within, Formula, Implementation};
use common::{cardgame, transmission, transmission_with_knowledge};
use test_log::test;

#[test]
fn split_covers_the_protocol() {
    let mas = cardgame();
    let b = mas.bdd();
    for coalition in [vec!["player"], vec!["dealer"], vec!["dealer", "player"]] {
        let names: Vec<String> = coalition.iter().map(|s| s.to_string()).collect();
        let agents = mas.agents_in_list(&names).unwrap();
        let moves = mas.protocol(&agents);

        let mut union = b.zero;
        let mut count = 0usize;
        for strat in split(&mas, &agents, moves) {
            union = b.apply_or(union, strat);
            // Every yielded strategy is internally non-conflicting for
            // every member of the coalition.
            for &agent in &agents {
                let mut rest = strat;
                while !b.is_zero(rest) {
                    let si = mas.pick_one_state_inputs(rest);
                    let s = b.exists(si, mas.inputs_cube());
                    let class = b.apply_and(rest, equiv_class(&mas, &[agent], s));
                    rest = b.apply_diff(rest, class);
                    assert!(
                        !is_conflicting(&mas, agent, class),
                        "conflicting class in a split strategy for {:?}",
                        coalition
                    );
                }
            }
            count += 1;
        }
        assert_eq!(union, moves, "split must cover the whole move set for {:?}", coalition);
        assert!(count >= 1);
    }
}

#[test]
fn filter_is_monotone() {
    let mas = transmission();
    let b = mas.bdd();
    let transmitter = mas.agent_id("transmitter").unwrap();
    let agents = vec![transmitter];
    let moves = mas.protocol(&agents);

    let s2 = mas.label("received").unwrap();
    let s1 = b.one;

    let until = filter_ceu(&mas, &agents, s1, s2, moves);
    let weak = filter_cew(&mas, &agents, s1, s2, moves);

    // filter_ceu(s1, s2, M) ⊇ s2.
    let s2_states = b.apply_and(s2, mas.states_mask());
    assert!(b.is_zero(b.apply_diff(s2_states, until)));
    // Weak until dominates strict until.
    assert!(b.is_zero(b.apply_diff(until, weak)));
    // Shrinking s1 can only shrink the result.
    let smaller = filter_ceu(&mas, &agents, b.apply_and(s1, b.apply_not(s2)), s2, moves);
    assert!(b.is_zero(b.apply_diff(smaller, until)));
}

#[test]
fn derived_operators_are_duals() {
    let mas = transmission_with_knowledge();
    let b = mas.bdd();
    let mask = b.apply_and(mas.reachable_states(), mas.states_mask());
    let p = Formula::atom("received").not();
    let q = Formula::atom("received");

    let pairs = [
        (
            Formula::caw(&["transmitter"], p.clone(), q.clone()),
            Formula::ceu(
                &["transmitter"],
                q.clone().not(),
                p.clone().not().and(q.clone().not()),
            )
            .not(),
        ),
        (p.clone().ax(), p.clone().not().ex().not()),
        (p.clone().ag(), p.clone().not().ef().not()),
        (
            p.clone().aw(q.clone()),
            q.clone().not().eu(p.clone().not().and(q.clone().not())).not(),
        ),
    ];
    for (lhs, rhs) in pairs {
        let l = eval_atlk(&mas, &lhs, Implementation::Naive, false).unwrap();
        let r = eval_atlk(&mas, &rhs, Implementation::Naive, false).unwrap();
        assert_eq!(
            b.apply_and(l, mask),
            b.apply_and(r, mask),
            "{lhs} and {rhs} must agree"
        );
    }
}

#[test]
fn double_negation_is_identity() {
    let mas = transmission_with_knowledge();
    let b = mas.bdd();
    let mask = b.apply_and(mas.reachable_states(), mas.states_mask());
    let phi = Formula::cex(&["transmitter"], Formula::atom("received").not());
    let doubled = phi.clone().not().not();

    for imp in Implementation::ALL {
        let direct = eval_atlk_within(&mas, &phi, Some(mask), imp, false).unwrap();
        let through = eval_atlk_within(&mas, &doubled, Some(mask), imp, false).unwrap();
        assert_eq!(
            b.apply_and(direct, mask),
            b.apply_and(through, mask),
            "double negation under {imp}"
        );
    }
}

#[test]
fn cache_is_transparent_to_partial_queries() {
    let mas = cardgame();
    let b = mas.bdd();
    // True at step-1 and step-2 states, false at the initial state.
    let formula = Formula::cex(&["player"], Formula::atom("step=1").not());

    let first = mas.init();
    let second = b.apply_and(mas.label("step=1").unwrap(), mas.reachable_states());
    let union = b.apply_or(first, second);

    // Query piecewise, with overlap, then the union on warm caches.
    eval_atlk_within(&mas, &formula, Some(first), Implementation::Partial, false).unwrap();
    eval_atlk_within(&mas, &formula, Some(second), Implementation::Partial, false).unwrap();
    let warm = eval_atlk_within(&mas, &formula, Some(union), Implementation::Partial, false).unwrap();

    // Same query on a cold cache.
    mas.reset_caches();
    let cold = eval_atlk_within(&mas, &formula, Some(union), Implementation::Partial, false).unwrap();

    assert_eq!(b.apply_and(warm, union), b.apply_and(cold, union));
}

#[test]
fn implementations_resolve_by_name() {
    for imp in Implementation::ALL {
        assert_eq!(Implementation::from_str(imp.name()).unwrap(), imp);
    }
    assert!(matches!(
        Implementation::from_str("magic"),
        Err(atlk_rs::Error::UnknownImplementation(_))
    ));
}

#[test]
fn dot_dump_mentions_the_states() {
    let mas = transmission();
    let agents = mas.all_agents();
    let dot = atlk_rs::dot::moves_to_dot(&mas, mas.protocol(&agents));
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("received=false"));
    assert!(dot.contains("->"));
}
