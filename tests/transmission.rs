//! The transmission scenario: a sender and a transmission medium jointly
//! control whether a bit gets through. Without observation, neither side can
//! force anything alone — the winning strategy would have to work from every
//! indistinguishable state, including those where the bit already got
//! through. Giving the transmitter an observable flag restores its power,
//! and a fairness constraint on the medium restores the sender's.

mod common;

use atlk_rs::Formula;
use common::{assert_agreement, transmission, transmission_post_fair, transmission_with_knowledge};
use test_log::test;

fn received() -> Formula {
    Formula::atom("received")
}

#[test]
fn blind_agents_force_nothing() {
    let mas = transmission();
    assert_agreement(&mas, &Formula::cef(&["sender"], received()), false, true);
    assert_agreement(&mas, &Formula::cex(&["sender"], received()), false, true);
    assert_agreement(&mas, &Formula::cex(&["transmitter"], received().not()), false, true);
    assert_agreement(&mas, &Formula::cef(&["transmitter"], received()), false, true);
    // CEG shapes are unsupported by backward.
    assert_agreement(&mas, &Formula::ceg(&["transmitter"], received().not()), false, false);
    assert_agreement(&mas, &Formula::ceg(&["sender"], received().not()), false, false);
}

#[test]
fn observation_restores_the_transmitter() {
    let mas = transmission_with_knowledge();
    assert_agreement(&mas, &Formula::cex(&["transmitter"], received().not()), true, true);
    assert_agreement(&mas, &Formula::ceg(&["transmitter"], received().not()), true, false);
    // The sender still observes nothing.
    assert_agreement(&mas, &Formula::cef(&["sender"], received()), false, true);
    assert_agreement(&mas, &Formula::cex(&["sender"], received()), false, true);
    assert_agreement(&mas, &Formula::ceg(&["sender"], received().not()), false, false);
    assert_agreement(&mas, &Formula::cef(&["transmitter"], received()), false, true);
    // Holds only where the bit already got through, which the initial state
    // is not.
    assert_agreement(&mas, &Formula::cew(&["transmitter"], received(), Formula::False), false, false);
}

#[test]
fn knowledge_operators_see_the_difference() {
    let blind = transmission();
    assert_agreement(&blind, &Formula::k("transmitter", received().not()), false, true);
    assert_agreement(
        &blind,
        &Formula::d(&["sender", "transmitter"], received().not()),
        false,
        true,
    );

    let informed = transmission_with_knowledge();
    assert_agreement(&informed, &Formula::k("transmitter", received().not()), true, true);
    assert_agreement(
        &informed,
        &Formula::d(&["sender", "transmitter"], received().not()),
        true,
        true,
    );
    // Group and common knowledge still fail through the blind sender.
    assert_agreement(&informed, &Formula::e(&["both"], received().not()), false, true);
    assert_agreement(&informed, &Formula::c(&["both"], received().not()), false, true);
}

#[test]
fn fairness_helps_the_sender() {
    // The backward seed computation does not account for fairness-avoidance
    // vacuity, so backward is only exercised on unconstrained models.
    let mas = transmission_post_fair();
    assert_agreement(&mas, &Formula::cef(&["sender"], received()), true, false);
    assert_agreement(&mas, &Formula::cex(&["sender"], received()), false, false);
    assert_agreement(&mas, &Formula::ceg(&["sender"], received().not()), false, false);
}

#[test]
fn fairness_can_be_refused_by_the_transmitter() {
    let mas = transmission_post_fair();
    // Always blocking yields no fair path at all, so the transmitter wins
    // every fair-path property vacuously.
    assert_agreement(&mas, &Formula::ceg(&["transmitter"], received().not()), true, false);
    assert_agreement(&mas, &Formula::cex(&["transmitter"], received().not()), true, false);
    assert_agreement(&mas, &Formula::cef(&["transmitter"], received()), true, false);
}
