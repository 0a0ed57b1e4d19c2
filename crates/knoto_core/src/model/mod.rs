//! Domain model types for knoto core.

pub mod node;
