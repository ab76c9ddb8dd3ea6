//! Core burn seed processing modules

pub mod queue;
pub mod pairing;
pub mod indices;
pub mod threshold;
pub mod pipeline;

// Re-export main types
pub use queue::ProcessingQueue;
pub use pairing::{PairingMachine, PairingState};
pub use indices::{IndexEngine, SceneBands, SpectralIndices};
pub use threshold::{sieve, SeedThresholder};
pub use pipeline::{BurnSeedPipeline, RunPlan, RunSummary};
