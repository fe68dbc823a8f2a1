//! Core business logic - parsing, session state, and balance computation.
//!
//! Everything in here is framework-agnostic and synchronous: the parser is a
//! pure function, the session is a plain owned value, and balances are
//! recomputed in full on demand.

/// Balance computation and settlement formatting
pub mod balance;

/// Receipt line parsing heuristics
pub mod parser;

/// Session-scoped item and roommate store
pub mod session;
