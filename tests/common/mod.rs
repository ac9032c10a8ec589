#![allow(dead_code)]

use atlk_rs::{check, eval_atlk, eval_atlk_within, Formula, Implementation, MasBuilder};
use atlk_rs::mas::MultiAgentSystem;

/// The card game: the dealer hands one of three cards (Ac beats K, K beats
/// Q, Q beats Ac) to the player and keeps one, then the player keeps or
/// swaps. The player sees its own card only; the dealer sees everything.
pub fn cardgame() -> MultiAgentSystem {
    let mut builder = MasBuilder::new();
    let step = builder.state_var("step", &["0", "1", "2"]);
    let pcard = builder.state_var("pcard", &["none", "Ac", "K", "Q"]);
    let dcard = builder.state_var("dcard", &["none", "Ac", "K", "Q"]);

    let dealer = builder.agent(
        "dealer",
        &["none", "dealAK", "dealAQ", "dealKA", "dealKQ", "dealQA", "dealQK"],
    );
    let player = builder.agent("player", &["none", "keep", "swap"]);
    builder.observes(dealer, &[step, pcard, dcard]);
    builder.observes(player, &[step, pcard]);

    let b = builder.bdd_rc();

    // The dealer deals exactly once, from the undealt initial configuration.
    let fresh = b.apply_and(
        builder.eq(step, "0"),
        b.apply_and(builder.eq(pcard, "none"), builder.eq(dcard, "none")),
    );
    let deals = b.apply_not(builder.action_eq(dealer, "none"));
    builder.protocol(dealer, b.apply_eq(fresh, deals));

    // The player acts once its card is dealt; its protocol depends on
    // observed variables only.
    let ready = b.apply_and(builder.eq(step, "1"), b.apply_not(builder.eq(pcard, "none")));
    let acts = b.apply_not(builder.action_eq(player, "none"));
    builder.protocol(player, b.apply_eq(ready, acts));

    builder.init(fresh);

    // step advances 0 -> 1 -> 2 and stays at 2.
    builder.trans(b.apply_imply(builder.eq(step, "0"), builder.eq_next(step, "1")));
    builder.trans(b.apply_imply(builder.eq(step, "1"), builder.eq_next(step, "2")));
    builder.trans(b.apply_imply(builder.eq(step, "2"), builder.eq_next(step, "2")));

    let unchanged = b.apply_and(builder.unchanged(pcard), builder.unchanged(dcard));
    let swapped = b.apply_and(builder.next_copies(pcard, dcard), builder.next_copies(dcard, pcard));

    for (deal, p, d) in [
        ("dealAK", "Ac", "K"),
        ("dealAQ", "Ac", "Q"),
        ("dealKA", "K", "Ac"),
        ("dealKQ", "K", "Q"),
        ("dealQA", "Q", "Ac"),
        ("dealQK", "Q", "K"),
    ] {
        let dealt = b.apply_and(builder.eq_next(pcard, p), builder.eq_next(dcard, d));
        builder.trans(b.apply_imply(builder.action_eq(dealer, deal), dealt));
    }
    builder.trans(b.apply_imply(
        b.apply_and(builder.eq(step, "0"), builder.action_eq(dealer, "none")),
        unchanged,
    ));
    builder.trans(b.apply_imply(builder.action_eq(player, "keep"), unchanged));
    builder.trans(b.apply_imply(builder.action_eq(player, "swap"), swapped));
    builder.trans(b.apply_imply(
        b.apply_and(builder.eq(step, "1"), builder.action_eq(player, "none")),
        unchanged,
    ));
    builder.trans(b.apply_imply(builder.eq(step, "2"), unchanged));

    let beats = b.apply_or_many([
        b.apply_and(builder.eq(pcard, "Ac"), builder.eq(dcard, "K")),
        b.apply_and(builder.eq(pcard, "K"), builder.eq(dcard, "Q")),
        b.apply_and(builder.eq(pcard, "Q"), builder.eq(dcard, "Ac")),
    ]);
    builder.label("win", b.apply_and(builder.eq(step, "2"), beats));
    builder.label("step=1", builder.eq(step, "1"));
    builder.label("pcard=Ac", builder.eq(pcard, "Ac"));
    builder.label("pcard=none", builder.eq(pcard, "none"));
    builder.label("dcard=none", builder.eq(dcard, "none"));
    builder.label("dcard=Ac", builder.eq(dcard, "Ac"));
    builder.label("dcard=K", builder.eq(dcard, "K"));
    builder.label("dcard=Q", builder.eq(dcard, "Q"));

    builder.group("all", &["dealer", "player"]);

    builder.build()
}

fn transmission_model(knowledge: bool, fairness: bool) -> MultiAgentSystem {
    let mut builder = MasBuilder::new();
    let received = builder.state_var("received", &["false", "true"]);
    let track = if fairness {
        Some(builder.state_var("tr", &["none", "block", "transmit"]))
    } else {
        None
    };

    let sender = builder.agent("sender", &["wait", "send"]);
    let transmitter = builder.agent("transmitter", &["block", "transmit"]);
    if knowledge {
        builder.observes(transmitter, &[received]);
    }

    let b = builder.bdd_rc();
    builder.init(builder.eq(received, "false"));
    if let Some(track) = track {
        builder.init(builder.eq(track, "none"));
    }

    // The bit stays received once it got through.
    let through = b.apply_and(
        builder.action_eq(sender, "send"),
        builder.action_eq(transmitter, "transmit"),
    );
    let cond = b.apply_or(builder.eq(received, "true"), through);
    builder.trans(b.apply_eq(builder.eq_next(received, "true"), cond));

    if let Some(track) = track {
        builder.trans(builder.next_tracks_action(track, transmitter));
        builder.fairness(builder.eq(track, "transmit"));
    }

    builder.label("received", builder.eq(received, "true"));
    builder.group("both", &["sender", "transmitter"]);

    builder.build()
}

/// Neither agent observes anything.
pub fn transmission() -> MultiAgentSystem {
    transmission_model(false, false)
}

/// The transmitter observes whether the bit got through.
pub fn transmission_with_knowledge() -> MultiAgentSystem {
    transmission_model(true, false)
}

/// A fairness constraint forces the transmitter to transmit infinitely
/// often, recorded in a state variable.
pub fn transmission_post_fair() -> MultiAgentSystem {
    transmission_model(false, true)
}

/// Check `formula` under every implementation and both pre-filtering modes,
/// asserting the expected verdict and that all produced sat sets agree on
/// the reachable states.
pub fn assert_agreement(
    mas: &MultiAgentSystem,
    formula: &Formula,
    expected: bool,
    with_backward: bool,
) {
    let b = mas.bdd();
    let mask = b.apply_and(mas.reachable_states(), mas.states_mask());
    let mut reference = None;
    for imp in Implementation::ALL {
        if imp == Implementation::Backward && !with_backward {
            continue;
        }
        for pre_filtering in [false, true] {
            // Results are memoized per (implementation, formula) regardless
            // of pre-filtering; start cold so both modes actually run.
            mas.reset_caches();
            let verdict = check(mas, formula, imp, pre_filtering)
                .unwrap_or_else(|e| panic!("check {formula} with {imp}: {e}"));
            assert_eq!(
                verdict, expected,
                "verdict for {formula} with {imp}, pre_filtering={pre_filtering}"
            );

            let sat = if imp.restricted() {
                eval_atlk_within(mas, formula, Some(mask), imp, pre_filtering).unwrap()
            } else {
                eval_atlk(mas, formula, imp, pre_filtering).unwrap()
            };
            let masked = b.apply_and(sat, mask);
            match reference {
                None => reference = Some(masked),
                Some(r) => assert_eq!(
                    masked, r,
                    "sat set for {formula} with {imp}, pre_filtering={pre_filtering}"
                ),
            }
        }
    }
}
