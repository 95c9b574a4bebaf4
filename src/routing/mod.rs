//! Routing decision module.
//!
//! Determines where a classified file's records go:
//! - Authorized-ad registry (plus mirrored detection)
//! - Alert feed (violation or suspicious, with priority)

pub mod decision;

pub use decision::*;
