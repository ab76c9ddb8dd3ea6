//! burnseed: incremental burn-scar seed detection for Sentinel-2 ARD
//!
//! Scenes found under a working directory are deduplicated against the
//! history of earlier runs, sorted by tile and date, and walked as pre/post
//! pairs of the same tile. For each pair the post-fire NBR and the pre/post
//! differences of NBR2 and SAVI are computed and thresholded into a binary
//! seed mask, ready for region growing.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    BandType, BurnError, BurnResult, HistoryEntry, IndexRaster, Product, RasterProfile,
    SceneRecord, ScenePair, SeedMask,
};

pub use config::{BandMapping, PipelineConfig, ThresholdConfig};
pub use io::{FileHistoryStore, GdalRasterIo, HistoryStore, ProcessingHistory, SceneCatalog};
pub use crate::core::{BurnSeedPipeline, PairingMachine, ProcessingQueue, RunSummary};
