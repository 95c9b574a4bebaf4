//! Detection ingestion pipeline.
//!
//! Coordinates, per accepted upload:
//! - Upload progress tracking
//! - Classification with a bounded wait
//! - Routing to the authorized-ad or alert branch
//! - Atomic persistence into the detection store
//!
//! Files run independently; each exposes a pollable status and can be
//! cancelled by removing it.

pub mod context;
pub mod coordinator;
pub mod events;
pub mod processor;
pub mod state;

pub use context::*;
pub use coordinator::*;
pub use events::*;
pub use processor::*;
pub use state::*;
