use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Single-band floating point index data (rows x cols)
pub type IndexImage = Array2<f32>;

/// Binary seed mask data, values in {0, 1}
pub type SeedMask = Array2<u8>;

/// One discovered scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub file_name: String,
    pub directory: PathBuf,
    pub tile_id: String,
    pub size_gib: f64,
    pub acquisition_date: String,
}

impl SceneRecord {
    /// Full path of the scene file
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Acquisition month (1-12), if the date field is a valid `YYYYMMDD` date
    pub fn acquisition_month(&self) -> Option<u32> {
        use chrono::Datelike;
        chrono::NaiveDate::parse_from_str(&self.acquisition_date, "%Y%m%d")
            .ok()
            .map(|date| date.month())
    }
}

impl fmt::Display for SceneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [tile {}, {}, {:.2} GiB]",
            self.file_name, self.tile_id, self.acquisition_date, self.size_gib
        )
    }
}

/// Scene already consumed by a previous run.
///
/// Keyed by `file_name`; the remaining fields are kept for human inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub file_name: String,
    #[serde(default)]
    pub directory: PathBuf,
    #[serde(default)]
    pub tile_id: String,
    #[serde(default)]
    pub size_gib: f64,
    #[serde(default)]
    pub acquisition_date: String,
}

impl From<&SceneRecord> for HistoryEntry {
    fn from(record: &SceneRecord) -> Self {
        Self {
            file_name: record.file_name.clone(),
            directory: record.directory.clone(),
            tile_id: record.tile_id.clone(),
            size_gib: record.size_gib,
            acquisition_date: record.acquisition_date.clone(),
        }
    }
}

/// Two scenes of the same tile: `pre` is the earlier acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePair {
    pub pre: SceneRecord,
    pub post: SceneRecord,
}

/// Pixel data type of an output band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandType {
    UInt8,
    Float32,
}

impl fmt::Display for BandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandType::UInt8 => write!(f, "uint8"),
            BandType::Float32 => write!(f, "float32"),
        }
    }
}

/// GeoTIFF compression scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Lzw,
}

impl Compression {
    /// Value of the GTiff `COMPRESS` creation option
    pub fn creation_option(&self) -> &'static str {
        match self {
            Compression::Lzw => "LZW",
        }
    }
}

/// Georeferencing and layout of a raster, copied from a source scene
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProfile {
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub dtype: BandType,
    pub geo_transform: [f64; 6],
    /// Coordinate reference system as WKT
    pub crs: String,
    pub no_data: Option<f64>,
    pub compress: Option<Compression>,
}

impl RasterProfile {
    /// Return a copy of this profile with a product override applied
    pub fn with_override(&self, product: &ProductOverride) -> Self {
        Self {
            dtype: product.dtype,
            count: product.count,
            compress: product.compress,
            ..self.clone()
        }
    }
}

/// Per-product changes applied to the base profile at write time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductOverride {
    pub dtype: BandType,
    pub count: usize,
    pub compress: Option<Compression>,
}

/// Products written for every scene pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    PostNbr,
    DNbr2,
    DSavi,
    BurnSeed,
}

impl Product {
    pub const ALL: [Product; 4] = [
        Product::PostNbr,
        Product::DNbr2,
        Product::DSavi,
        Product::BurnSeed,
    ];

    /// Suffix used in output file names
    pub fn name(&self) -> &'static str {
        match self {
            Product::PostNbr => "postnbr",
            Product::DNbr2 => "dnbr2",
            Product::DSavi => "dsavi",
            Product::BurnSeed => "burnseed",
        }
    }

    pub fn profile_override(&self) -> ProductOverride {
        match self {
            Product::BurnSeed => ProductOverride {
                dtype: BandType::UInt8,
                count: 1,
                compress: Some(Compression::Lzw),
            },
            _ => ProductOverride {
                dtype: BandType::Float32,
                count: 1,
                compress: None,
            },
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index raster with the profile of the scene it was georeferenced from
#[derive(Debug, Clone)]
pub struct IndexRaster {
    pub data: IndexImage,
    pub profile: RasterProfile,
}

/// Band data handed to the raster writer
#[derive(Debug, Clone)]
pub enum BandData {
    Float32(Array2<f32>),
    UInt8(Array2<u8>),
}

impl BandData {
    pub fn dim(&self) -> (usize, usize) {
        match self {
            BandData::Float32(data) => data.dim(),
            BandData::UInt8(data) => data.dim(),
        }
    }

    pub fn band_type(&self) -> BandType {
        match self {
            BandData::Float32(_) => BandType::Float32,
            BandData::UInt8(_) => BandType::UInt8,
        }
    }
}

/// Error types for burn seed processing
#[derive(Debug, thiserror::Error)]
pub enum BurnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Too few images to process: {found} eligible scene(s), at least 2 required")]
    TooFewScenes { found: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid scene name: {0}")]
    InvalidSceneName(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("History store error: {0}")]
    History(String),
}

impl BurnError {
    /// Whether this error belongs to the fatal precondition class
    pub fn is_precondition(&self) -> bool {
        matches!(self, BurnError::Precondition(_) | BurnError::TooFewScenes { .. })
    }
}

/// Result type for burn seed operations
pub type BurnResult<T> = Result<T, BurnError>;

/// Check that a path is an existing directory
pub(crate) fn require_dir(path: &Path, role: &str) -> BurnResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(BurnError::Precondition(format!(
            "{} directory does not exist: {}",
            role,
            path.display()
        )))
    }
}
