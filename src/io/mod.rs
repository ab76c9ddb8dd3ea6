//! I/O modules for scene discovery, processing history and rasters

pub mod catalog;
pub mod history;
pub mod raster;
pub mod writer;

pub use catalog::{SceneCatalog, SceneName, SCENE_SUFFIX};
pub use history::{FileHistoryStore, HistoryStore, ProcessingHistory};
pub use raster::{GdalRasterIo, RasterInfo, RasterIo, RasterReader, RasterWriter};
pub use writer::{output_name, ResultWriter};
