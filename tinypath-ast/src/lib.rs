use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Plain IEEE-754 comparison: NaN is unordered and only `Ne` holds.
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
        }
    }
}

/// One step of a compiled path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    Key(String),
    Wildcard,
    Index(usize),
    Compare { op: CompareOp, literal: f64 },
}

impl Selector {
    pub fn is_compare(&self) -> bool {
        matches!(self, Selector::Compare { .. })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Key(name) => write!(f, ".{name}"),
            Selector::Wildcard => f.write_str(".*"),
            Selector::Index(i) => write!(f, "[{i}]"),
            Selector::Compare { op, literal } => write!(f, "{}{literal}", op.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("comparison at step {position} is not the last step of the path")]
pub struct InvalidProgram {
    pub position: usize,
}

/// An ordered, immutable list of selectors.
///
/// A comparison may only appear as the final selector. The constructor and
/// deserialization both enforce this, so evaluation never has to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Selector>", into = "Vec<Selector>")]
pub struct Program {
    selectors: Vec<Selector>,
}

impl Program {
    pub fn new(selectors: Vec<Selector>) -> Result<Self, InvalidProgram> {
        let last = selectors.len().saturating_sub(1);
        if let Some(position) = selectors
            .iter()
            .position(|s| s.is_compare())
            .filter(|&p| p != last)
        {
            return Err(InvalidProgram { position });
        }
        Ok(Self { selectors })
    }

    /// The identity program, compiled from a bare `$`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.selectors.iter()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl TryFrom<Vec<Selector>> for Program {
    type Error = InvalidProgram;

    fn try_from(selectors: Vec<Selector>) -> Result<Self, Self::Error> {
        Program::new(selectors)
    }
}

impl From<Program> for Vec<Selector> {
    fn from(program: Program) -> Self {
        program.selectors
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Renders the canonical source text, e.g. `$.items[0].price>10`.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for selector in &self.selectors {
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}
