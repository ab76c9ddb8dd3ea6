//! Pipeline configuration
//!
//! The configuration is loaded once (TOML file plus command-line overrides)
//! and then handed to every stage as an immutable value.

use crate::types::{require_dir, BurnError, BurnResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const THRESH_DSAVI: &str = "threshdsavi";
pub const THRESH_POSTNBR: &str = "threshpostnbr";
pub const THRESH_DNBR2: &str = "threshdnbr2";
pub const THRESH_TYPE: &str = "type";

/// Threshold rule used to build the seed mask
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    pub threshdsavi: f32,
    pub threshpostnbr: f32,
    pub threshdnbr2: f32,
    /// How the thresholds are applied ("global" == all images). Not used in processing.
    pub kind: String,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshdsavi: 0.2853,
            threshpostnbr: 0.2395,
            threshdnbr2: 0.8,
            kind: "global".to_string(),
        }
    }
}

impl ThresholdConfig {
    /// Build thresholds from a raw key/value table.
    ///
    /// Every numeric key must be present; a missing or non-numeric value is a
    /// configuration error.
    pub fn from_table(table: &toml::Table) -> BurnResult<Self> {
        let number = |key: &str| -> BurnResult<f32> {
            let value = table.get(key).ok_or_else(|| {
                BurnError::Configuration(format!("threshold key '{}' is missing", key))
            })?;
            match value {
                toml::Value::Float(v) => Ok(*v as f32),
                toml::Value::Integer(v) => Ok(*v as f32),
                other => Err(BurnError::Configuration(format!(
                    "threshold key '{}' must be a number, found {}",
                    key,
                    other.type_str()
                ))),
            }
        };

        let kind = match table.get(THRESH_TYPE) {
            Some(toml::Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(BurnError::Configuration(format!(
                    "threshold key '{}' must be a string, found {}",
                    THRESH_TYPE,
                    other.type_str()
                )))
            }
            None => "global".to_string(),
        };

        Ok(Self {
            threshdsavi: number(THRESH_DSAVI)?,
            threshpostnbr: number(THRESH_POSTNBR)?,
            threshdnbr2: number(THRESH_DNBR2)?,
            kind,
        })
    }
}

/// 1-based band indices of the reflectance product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BandMapping {
    pub red: usize,
    pub nir: usize,
    pub swir1: usize,
    pub swir2: usize,
}

impl Default for BandMapping {
    fn default() -> Self {
        Self {
            red: 3,
            nir: 7,
            swir1: 9,
            swir2: 10,
        }
    }
}

impl BandMapping {
    pub fn max_index(&self) -> usize {
        self.red.max(self.nir).max(self.swir1).max(self.swir2)
    }
}

/// On-disk layout of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    working_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    thresholds: Option<toml::Table>,
    granules: Vec<String>,
    months_out: Vec<String>,
    min_scene_size_gib: Option<f64>,
    bands: Option<BandMapping>,
    savi_l: Option<f32>,
    sieve_size: Option<usize>,
}

/// Complete, validated pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    pub thresholds: ThresholdConfig,
    /// Tile allow-list; empty means every tile is processed
    pub granules: Vec<String>,
    /// Months (1-12) excluded from processing
    pub months_out: Vec<u32>,
    /// Scenes must be strictly larger than this to count as full coverage
    pub min_scene_size_gib: f64,
    pub bands: BandMapping,
    pub savi_l: f32,
    /// Foreground clumps smaller than this many pixels are removed
    pub sieve_size: usize,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

impl PipelineConfig {
    /// Configuration with default parameters for the given directories
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(working_dir: P, output_dir: Q) -> Self {
        Self {
            working_dir: working_dir.into(),
            output_dir: output_dir.into(),
            thresholds: ThresholdConfig::default(),
            granules: Vec::new(),
            months_out: Vec::new(),
            min_scene_size_gib: 1.0,
            bands: BandMapping::default(),
            savi_l: 0.5,
            sieve_size: 3,
            source: None,
        }
    }

    /// Load configuration from a TOML file, with optional directory overrides
    pub fn load<P: AsRef<Path>>(
        path: Option<P>,
        working_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> BurnResult<Self> {
        let path = match path {
            Some(path) => path.as_ref().to_path_buf(),
            None => return Self::from_file(ConfigFile::default(), working_dir, output_dir),
        };

        let text = std::fs::read_to_string(&path)?;
        let file = toml::from_str::<ConfigFile>(&text).map_err(|e| {
            BurnError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_file(file, working_dir, output_dir)?;
        config.source = Some(path);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(
        text: &str,
        working_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> BurnResult<Self> {
        let file = toml::from_str::<ConfigFile>(text)
            .map_err(|e| BurnError::Configuration(format!("failed to parse configuration: {}", e)))?;
        Self::from_file(file, working_dir, output_dir)
    }

    fn from_file(
        file: ConfigFile,
        working_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> BurnResult<Self> {
        let working_dir = working_dir.or(file.working_dir).ok_or_else(|| {
            BurnError::Configuration("no working directory given".to_string())
        })?;
        // Outputs go next to the inputs unless told otherwise
        let output_dir = output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| working_dir.clone());

        let mut config = Self::new(working_dir, output_dir);

        if let Some(table) = file.thresholds {
            config.thresholds = ThresholdConfig::from_table(&table)?;
        }
        config.granules = file.granules;
        config.months_out = file
            .months_out
            .iter()
            .map(|m| parse_month(m))
            .collect::<BurnResult<Vec<_>>>()?;
        if let Some(size) = file.min_scene_size_gib {
            config.min_scene_size_gib = size;
        }
        if let Some(bands) = file.bands {
            config.bands = bands;
        }
        if let Some(l) = file.savi_l {
            config.savi_l = l;
        }
        if let Some(size) = file.sieve_size {
            config.sieve_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> BurnResult<()> {
        let bands = [self.bands.red, self.bands.nir, self.bands.swir1, self.bands.swir2];
        if bands.iter().any(|&b| b == 0) {
            return Err(BurnError::Configuration(
                "band indices are 1-based and must be greater than zero".to_string(),
            ));
        }
        if !self.min_scene_size_gib.is_finite() || self.min_scene_size_gib < 0.0 {
            return Err(BurnError::Configuration(format!(
                "invalid minimum scene size: {}",
                self.min_scene_size_gib
            )));
        }
        if self.sieve_size == 0 {
            return Err(BurnError::Configuration(
                "sieve size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that the working and output directories exist
    pub fn validate_directories(&self) -> BurnResult<()> {
        require_dir(&self.working_dir, "working")?;
        require_dir(&self.output_dir, "output")
    }

    /// Whether a tile passes the granule allow-list
    pub fn allows_tile(&self, tile_id: &str) -> bool {
        self.granules.is_empty() || self.granules.iter().any(|g| g == tile_id)
    }

    /// Whether a month is excluded by the seasonal filter
    pub fn excludes_month(&self, month: u32) -> bool {
        self.months_out.contains(&month)
    }
}

fn parse_month(value: &str) -> BurnResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => Ok(month),
        _ => Err(BurnError::Configuration(format!(
            "invalid month in months_out: '{}'",
            value
        ))),
    }
}
