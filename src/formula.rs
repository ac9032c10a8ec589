//! The ATLK formula tree.
//!
//! Formulas are pure values: structural equality and hashing make them usable
//! as memoization keys. Strategic operators carry the coalition as a list of
//! agent or group names, resolved against the system at evaluation time.

use std::fmt;

/// An ATLK formula over atomic propositions, boolean connectives, fair-CTL
/// temporal operators, epistemic operators and strategic operators.
///
/// `CEX`/`CEU`/`CEW` read "the coalition has a strategy forcing X/U/W along
/// all fair outcomes"; `CA*` are the universal duals, `CEF`/`CEG` the derived
/// eventually/globally forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    True,
    False,
    /// The initial states of the system.
    Init,
    /// The reachable states of the system.
    Reachable,
    /// A named state set registered on the system.
    Atom(String),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    EX(Box<Formula>),
    AX(Box<Formula>),
    EF(Box<Formula>),
    AF(Box<Formula>),
    EG(Box<Formula>),
    AG(Box<Formula>),
    EU(Box<Formula>, Box<Formula>),
    AU(Box<Formula>, Box<Formula>),
    EW(Box<Formula>, Box<Formula>),
    AW(Box<Formula>, Box<Formula>),
    /// `agent` considers possible a state satisfying the sub-formula.
    NK(String, Box<Formula>),
    /// `agent` knows the sub-formula.
    K(String, Box<Formula>),
    NE(Vec<String>, Box<Formula>),
    /// Everybody in the group knows.
    E(Vec<String>, Box<Formula>),
    ND(Vec<String>, Box<Formula>),
    /// Distributed knowledge in the group.
    D(Vec<String>, Box<Formula>),
    NC(Vec<String>, Box<Formula>),
    /// Common knowledge in the group.
    C(Vec<String>, Box<Formula>),
    CEX(Vec<String>, Box<Formula>),
    CAX(Vec<String>, Box<Formula>),
    CEF(Vec<String>, Box<Formula>),
    CAF(Vec<String>, Box<Formula>),
    CEG(Vec<String>, Box<Formula>),
    CAG(Vec<String>, Box<Formula>),
    CEU(Vec<String>, Box<Formula>, Box<Formula>),
    CAU(Vec<String>, Box<Formula>, Box<Formula>),
    CEW(Vec<String>, Box<Formula>, Box<Formula>),
    CAW(Vec<String>, Box<Formula>, Box<Formula>),
}

fn group(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Formula {
    pub fn atom(name: impl Into<String>) -> Self {
        Formula::Atom(name.into())
    }

    pub fn not(self) -> Self {
        Formula::Not(Box::new(self))
    }
    pub fn and(self, other: Self) -> Self {
        Formula::And(Box::new(self), Box::new(other))
    }
    pub fn or(self, other: Self) -> Self {
        Formula::Or(Box::new(self), Box::new(other))
    }
    pub fn implies(self, other: Self) -> Self {
        Formula::Implies(Box::new(self), Box::new(other))
    }
    pub fn iff(self, other: Self) -> Self {
        Formula::Iff(Box::new(self), Box::new(other))
    }

    pub fn ex(self) -> Self {
        Formula::EX(Box::new(self))
    }
    pub fn ax(self) -> Self {
        Formula::AX(Box::new(self))
    }
    pub fn ef(self) -> Self {
        Formula::EF(Box::new(self))
    }
    pub fn af(self) -> Self {
        Formula::AF(Box::new(self))
    }
    pub fn eg(self) -> Self {
        Formula::EG(Box::new(self))
    }
    pub fn ag(self) -> Self {
        Formula::AG(Box::new(self))
    }
    pub fn eu(self, other: Self) -> Self {
        Formula::EU(Box::new(self), Box::new(other))
    }
    pub fn au(self, other: Self) -> Self {
        Formula::AU(Box::new(self), Box::new(other))
    }
    pub fn ew(self, other: Self) -> Self {
        Formula::EW(Box::new(self), Box::new(other))
    }
    pub fn aw(self, other: Self) -> Self {
        Formula::AW(Box::new(self), Box::new(other))
    }

    pub fn nk(agent: &str, phi: Self) -> Self {
        Formula::NK(agent.to_string(), Box::new(phi))
    }
    pub fn k(agent: &str, phi: Self) -> Self {
        Formula::K(agent.to_string(), Box::new(phi))
    }
    pub fn ne(agents: &[&str], phi: Self) -> Self {
        Formula::NE(group(agents), Box::new(phi))
    }
    pub fn e(agents: &[&str], phi: Self) -> Self {
        Formula::E(group(agents), Box::new(phi))
    }
    pub fn nd(agents: &[&str], phi: Self) -> Self {
        Formula::ND(group(agents), Box::new(phi))
    }
    pub fn d(agents: &[&str], phi: Self) -> Self {
        Formula::D(group(agents), Box::new(phi))
    }
    pub fn nc(agents: &[&str], phi: Self) -> Self {
        Formula::NC(group(agents), Box::new(phi))
    }
    pub fn c(agents: &[&str], phi: Self) -> Self {
        Formula::C(group(agents), Box::new(phi))
    }

    pub fn cex(agents: &[&str], phi: Self) -> Self {
        Formula::CEX(group(agents), Box::new(phi))
    }
    pub fn cax(agents: &[&str], phi: Self) -> Self {
        Formula::CAX(group(agents), Box::new(phi))
    }
    pub fn cef(agents: &[&str], phi: Self) -> Self {
        Formula::CEF(group(agents), Box::new(phi))
    }
    pub fn caf(agents: &[&str], phi: Self) -> Self {
        Formula::CAF(group(agents), Box::new(phi))
    }
    pub fn ceg(agents: &[&str], phi: Self) -> Self {
        Formula::CEG(group(agents), Box::new(phi))
    }
    pub fn cag(agents: &[&str], phi: Self) -> Self {
        Formula::CAG(group(agents), Box::new(phi))
    }
    pub fn ceu(agents: &[&str], phi: Self, psi: Self) -> Self {
        Formula::CEU(group(agents), Box::new(phi), Box::new(psi))
    }
    pub fn cau(agents: &[&str], phi: Self, psi: Self) -> Self {
        Formula::CAU(group(agents), Box::new(phi), Box::new(psi))
    }
    pub fn cew(agents: &[&str], phi: Self, psi: Self) -> Self {
        Formula::CEW(group(agents), Box::new(phi), Box::new(psi))
    }
    pub fn caw(agents: &[&str], phi: Self, psi: Self) -> Self {
        Formula::CAW(group(agents), Box::new(phi), Box::new(psi))
    }

    /// The coalition of a strategic operator, if this is one.
    pub fn coalition(&self) -> Option<&[String]> {
        use Formula::*;
        match self {
            CEX(g, _) | CAX(g, _) | CEF(g, _) | CAF(g, _) | CEG(g, _) | CAG(g, _)
            | CEU(g, _, _) | CAU(g, _, _) | CEW(g, _, _) | CAW(g, _, _) => Some(g),
            _ => None,
        }
    }
}

fn fmt_group(f: &mut fmt::Formatter<'_>, g: &[String]) -> fmt::Result {
    let mut first = true;
    for name in g {
        if !first {
            write!(f, ",")?;
        }
        write!(f, "'{}'", name)?;
        first = false;
    }
    Ok(())
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Formula::*;
        match self {
            True => write!(f, "True"),
            False => write!(f, "False"),
            Init => write!(f, "Init"),
            Reachable => write!(f, "Reachable"),
            Atom(s) => write!(f, "'{}'", s),
            Not(p) => write!(f, "~{}", p),
            And(p, q) => write!(f, "({} & {})", p, q),
            Or(p, q) => write!(f, "({} | {})", p, q),
            Implies(p, q) => write!(f, "({} -> {})", p, q),
            Iff(p, q) => write!(f, "({} <-> {})", p, q),
            EX(p) => write!(f, "EX {}", p),
            AX(p) => write!(f, "AX {}", p),
            EF(p) => write!(f, "EF {}", p),
            AF(p) => write!(f, "AF {}", p),
            EG(p) => write!(f, "EG {}", p),
            AG(p) => write!(f, "AG {}", p),
            EU(p, q) => write!(f, "E[{} U {}]", p, q),
            AU(p, q) => write!(f, "A[{} U {}]", p, q),
            EW(p, q) => write!(f, "E[{} W {}]", p, q),
            AW(p, q) => write!(f, "A[{} W {}]", p, q),
            NK(a, p) => write!(f, "nK<'{}'> {}", a, p),
            K(a, p) => write!(f, "K<'{}'> {}", a, p),
            NE(g, p) => {
                write!(f, "nE<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            E(g, p) => {
                write!(f, "E<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            ND(g, p) => {
                write!(f, "nD<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            D(g, p) => {
                write!(f, "D<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            NC(g, p) => {
                write!(f, "nC<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            C(g, p) => {
                write!(f, "C<")?;
                fmt_group(f, g)?;
                write!(f, "> {}", p)
            }
            CEX(g, p) => {
                write!(f, "<")?;
                fmt_group(f, g)?;
                write!(f, "> X {}", p)
            }
            CAX(g, p) => {
                write!(f, "[")?;
                fmt_group(f, g)?;
                write!(f, "] X {}", p)
            }
            CEF(g, p) => {
                write!(f, "<")?;
                fmt_group(f, g)?;
                write!(f, "> F {}", p)
            }
            CAF(g, p) => {
                write!(f, "[")?;
                fmt_group(f, g)?;
                write!(f, "] F {}", p)
            }
            CEG(g, p) => {
                write!(f, "<")?;
                fmt_group(f, g)?;
                write!(f, "> G {}", p)
            }
            CAG(g, p) => {
                write!(f, "[")?;
                fmt_group(f, g)?;
                write!(f, "] G {}", p)
            }
            CEU(g, p, q) => {
                write!(f, "<")?;
                fmt_group(f, g)?;
                write!(f, ">[{} U {}]", p, q)
            }
            CAU(g, p, q) => {
                write!(f, "[")?;
                fmt_group(f, g)?;
                write!(f, "][{} U {}]", p, q)
            }
            CEW(g, p, q) => {
                write!(f, "<")?;
                fmt_group(f, g)?;
                write!(f, ">[{} W {}]", p, q)
            }
            CAW(g, p, q) => {
                write!(f, "[")?;
                fmt_group(f, g)?;
                write!(f, "][{} W {}]", p, q)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let f = Formula::cex(&["dealer"], Formula::atom("pcard=Ac"));
        assert_eq!(f.to_string(), "<'dealer'> X 'pcard=Ac'");
        let f = Formula::atom("step=1").implies(Formula::cex(&["player"], Formula::atom("win")).not()).ag();
        assert_eq!(f.to_string(), "AG ('step=1' -> ~<'player'> X 'win')");
    }

    #[test]
    fn test_structural_equality() {
        let a = Formula::ceu(&["a", "b"], Formula::True, Formula::atom("p"));
        let b = Formula::ceu(&["a", "b"], Formula::True, Formula::atom("p"));
        assert_eq!(a, b);
        let c = Formula::ceu(&["b", "a"], Formula::True, Formula::atom("p"));
        assert_ne!(a, c);
    }
}
