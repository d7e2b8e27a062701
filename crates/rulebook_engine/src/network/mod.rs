//! The matching network.
//!
//! [`NetworkSpec`] is the immutable node graph built once per knowledge base.
//! [`NetworkMemory`] is the state one session keeps in it, and a
//! [`Propagator`] applies working memory deltas to that state.

mod memory;
mod node;
mod propagate;
mod token;

pub use memory::{MemoryStats, NetworkMemory};
pub use node::{AlphaId, AlphaNode, BetaNode, JoinIndex, NetworkSpec, RuleId, RuleNetwork};
pub use propagate::Propagator;
pub use token::Token;
