//! Consequence dialects.

use std::fmt;
use std::str::FromStr;

use rulebook_foundation::{Error, Result};

/// The action language a rule's consequence is written in.
///
/// Dialects share one statement tree and one executor; they differ only in
/// statement termination.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Java-style: every simple statement ends with `;`.
    #[default]
    Java,
    /// MVEL-style: `;` is optional and a line break ends a statement.
    Mvel,
}

impl Dialect {
    /// Returns the dialect's name as used in `dialect "..."` attributes.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Mvel => "mvel",
        }
    }

    /// Returns true if statements must be terminated with `;`.
    #[must_use]
    pub const fn requires_semicolons(self) -> bool {
        matches!(self, Self::Java)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "mvel" => Ok(Self::Mvel),
            other => Err(Error::evaluation(format!("unknown dialect: {other}"))),
        }
    }
}
