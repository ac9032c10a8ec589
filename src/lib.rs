//! # atlk-rs: ATLK model checking under imperfect information
//!
//! **`atlk-rs`** decides whether a finite multi-agent transition system
//! satisfies a formula of ATLK with fairness — alternating-time temporal
//! logic with knowledge operators — under *imperfect information* and
//! *imperfect recall* strategies: each agent's choices may depend only on
//! what it observes, uniformly across indistinguishable states.
//!
//! ## Five algorithms, one answer
//!
//! Strategic operators (`<g> X p`, `<g>[p U q]`, `<g>[p W q]` and their
//! duals) are evaluated by one of five interchangeable algorithms, selected
//! by [`Implementation`]:
//!
//! - `naive` — enumerate every maximal uniform strategy of the protocol;
//! - `partial` — grow partial strategies covering only the states of
//!   interest;
//! - `early` — partial strategies with eager win/loss classification,
//!   recursing only on undecided states;
//! - `backward` — grow strategies backward from winning states (`CEX` and
//!   `CEU` shapes only);
//! - `symbolic` — compile the strategy space into extra state variables and
//!   answer with one nested fixpoint, no enumeration at all.
//!
//! All five return the same state set for the same system and formula.
//!
//! ## Basic usage
//!
//! Systems are built programmatically with [`MasBuilder`]; formulas with the
//! combinators on [`Formula`]:
//!
//! ```
//! use atlk_rs::{check, Formula, Implementation, MasBuilder};
//!
//! let mut builder = MasBuilder::new();
//! let bit = builder.state_var("bit", &["zero", "one"]);
//! let setter = builder.agent("setter", &["set", "skip"]);
//! builder.observes(setter, &[bit]);
//! builder.init(builder.eq(bit, "zero"));
//! let set = builder.bdd().apply_and(builder.action_eq(setter, "set"), builder.eq_next(bit, "one"));
//! let skip = builder.bdd().apply_and(builder.action_eq(setter, "skip"), builder.unchanged(bit));
//! builder.trans(builder.bdd().apply_or(set, skip));
//! builder.label("one", builder.eq(bit, "one"));
//! let mas = builder.build();
//!
//! let formula = Formula::cef(&["setter"], Formula::atom("one"));
//! assert!(check(&mas, &formula, Implementation::Partial, false).unwrap());
//! ```
//!
//! ## Core components
//!
//! - [`bdd`]: the BDD manager every set representation goes through.
//! - [`mas`]: multi-agent transition systems and their builder.
//! - [`formula`]: the ATLK formula tree.
//! - [`filter`]: fixpoints deciding what a fixed move set can force.
//! - [`split`]: enumeration of maximal uniform strategies.
//! - [`dispatch`]: the evaluator, memoization and the [`check`] entry point.

mod backward;
pub mod bdd;
pub mod ctl;
pub mod dispatch;
pub mod dot;
mod early;
pub mod epistemic;
pub mod error;
pub mod filter;
pub mod formula;
pub mod mas;
mod naive;
mod partial;
pub mod reference;
pub mod split;
mod symbolic;

pub use crate::dispatch::{check, eval_atlk, eval_atlk_within, Implementation};
pub use crate::error::{Error, Result};
pub use crate::formula::Formula;
pub use crate::mas::{AgentId, MasBuilder, MultiAgentSystem, ScalarVar};
pub use crate::reference::Ref;
