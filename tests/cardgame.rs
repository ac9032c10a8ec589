//! The card game scenario: the dealer controls the deal, the player only
//! sees its own card, so the player can never force a win while the dealer
//! can force one on it.

mod common;

use atlk_rs::{check, Formula, Implementation};
use common::{assert_agreement, cardgame};
use test_log::test;

fn win() -> Formula {
    Formula::atom("win")
}

#[test]
fn dealer_can_force_the_first_deal() {
    let mas = cardgame();
    assert_agreement(&mas, &Formula::cex(&["dealer"], Formula::atom("pcard=Ac")), true, true);
}

#[test]
fn dealer_cannot_keep_the_player_from_winning() {
    let mas = cardgame();
    // Whatever is dealt, one of keep/swap wins, so no dealer strategy
    // avoids 'win' on all paths. CEG is not supported by backward.
    assert_agreement(&mas, &Formula::ceg(&["dealer"], win().not()), false, false);
    assert_agreement(&mas, &Formula::caf(&["dealer"], win()), true, false);
}

#[test]
fn player_cannot_force_a_win() {
    let mas = cardgame();
    assert_agreement(&mas, &Formula::cef(&["player"], win()), false, true);
    let never_wins_blind = Formula::atom("step=1")
        .implies(Formula::cex(&["player"], win()).not())
        .ag();
    assert_agreement(&mas, &never_wins_blind, true, true);
}

#[test]
fn player_cannot_avoid_an_ace() {
    let mas = cardgame();
    assert_agreement(&mas, &Formula::cax(&["player"], Formula::atom("pcard=Ac")), true, true);
}

#[test]
fn grand_coalition_controls_everything() {
    let mas = cardgame();
    // Dealer and player together force a win; resolved through the group
    // name as well as the member list.
    assert_agreement(&mas, &Formula::cef(&["all"], win()), true, true);
    assert_agreement(&mas, &Formula::cef(&["dealer", "player"], win()), true, true);
}

#[test]
fn knowledge_at_the_start() {
    let mas = cardgame();
    let formula = Formula::k("player", Formula::atom("pcard=none"))
        .and(Formula::k("player", Formula::atom("dcard=none")));
    assert_agreement(&mas, &formula, true, true);
}

#[test]
fn player_never_learns_the_dealer_card() {
    let mas = cardgame();
    let knows_some_card = Formula::k("player", Formula::atom("dcard=Ac"))
        .or(Formula::k("player", Formula::atom("dcard=K")))
        .or(Formula::k("player", Formula::atom("dcard=Q")));
    let formula = Formula::atom("step=1").implies(knows_some_card.not()).ag();
    assert_agreement(&mas, &formula, true, true);
}

#[test]
fn plain_ctl_still_works() {
    let mas = cardgame();
    assert_agreement(&mas, &win().not().eg(), true, true);
    assert_agreement(&mas, &win().ef(), true, true);
    assert_agreement(&mas, &win().af(), false, true);
}

#[test]
fn backward_rejects_weak_shapes() {
    let mas = cardgame();
    for formula in [
        Formula::ceg(&["dealer"], win().not()),
        Formula::caf(&["dealer"], win()),
        Formula::cew(&["dealer"], win().not(), Formula::False),
        Formula::cau(&["dealer"], Formula::True, win()),
    ] {
        let result = check(&mas, &formula, Implementation::Backward, false);
        assert!(
            matches!(result, Err(atlk_rs::Error::UnsupportedOperator { .. })),
            "expected UnsupportedOperator for {formula}"
        );
    }
}

#[test]
fn unknown_names_are_reported() {
    let mas = cardgame();
    let bad_agent = Formula::cex(&["croupier"], win());
    assert!(matches!(
        check(&mas, &bad_agent, Implementation::Partial, false),
        Err(atlk_rs::Error::UnknownAgent(_))
    ));
    let bad_atom = Formula::atom("jackpot").ef();
    assert!(matches!(
        check(&mas, &bad_atom, Implementation::Partial, false),
        Err(atlk_rs::Error::UnknownAtom(_))
    ));
}
