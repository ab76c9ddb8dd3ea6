//! Raster read/write boundary
//!
//! The pipeline only talks to the traits in this module. `GdalRasterIo` is the
//! production backend; tests substitute an in-memory one.

use crate::types::{BandData, BandType, BurnError, BurnResult, RasterProfile};
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Summary of an opened raster
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub name: String,
    pub band_count: usize,
    pub width: usize,
    pub height: usize,
    pub profile: RasterProfile,
}

impl RasterInfo {
    /// CRS as stored in the profile
    pub fn crs(&self) -> &str {
        &self.profile.crs
    }
}

/// Read access to one opened raster
pub trait RasterReader {
    fn info(&self) -> &RasterInfo;

    /// Read a 1-based band as float32, shaped (height, width)
    fn read_band(&self, index: usize) -> BurnResult<Array2<f32>>;
}

/// Write access to one raster created from a profile
pub trait RasterWriter {
    /// Write a full 1-based band
    fn write_band(&mut self, index: usize, data: &BandData) -> BurnResult<()>;
}

/// Opens rasters for reading and creates rasters for writing
pub trait RasterIo {
    type Reader: RasterReader;
    type Writer: RasterWriter;

    fn open_read(&self, path: &Path) -> BurnResult<Self::Reader>;

    fn open_write(&self, path: &Path, profile: &RasterProfile) -> BurnResult<Self::Writer>;
}

/// GeoTIFF backend built on GDAL
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalRasterIo;

pub struct GdalReader {
    dataset: Dataset,
    info: RasterInfo,
}

pub struct GdalWriter {
    dataset: Dataset,
    path: PathBuf,
    profile: RasterProfile,
}

impl RasterIo for GdalRasterIo {
    type Reader = GdalReader;
    type Writer = GdalWriter;

    fn open_read(&self, path: &Path) -> BurnResult<GdalReader> {
        let dataset = Dataset::open(path)?;

        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count().max(0) as usize;
        let geo_transform = dataset.geo_transform()?;
        let crs = dataset.projection();
        let no_data = if band_count > 0 {
            dataset.rasterband(1)?.no_data_value()
        } else {
            None
        };

        let info = RasterInfo {
            name: path.display().to_string(),
            band_count,
            width,
            height,
            profile: RasterProfile {
                width,
                height,
                count: band_count,
                // bands are always delivered as float32
                dtype: BandType::Float32,
                geo_transform,
                crs,
                no_data,
                compress: None,
            },
        };

        Ok(GdalReader { dataset, info })
    }

    fn open_write(&self, path: &Path, profile: &RasterProfile) -> BurnResult<GdalWriter> {
        let driver = DriverManager::get_driver_by_name("GTiff")?;

        let mut options = Vec::new();
        if let Some(compress) = profile.compress {
            options.push(RasterCreationOption {
                key: "COMPRESS",
                value: compress.creation_option(),
            });
        }

        let (width, height, count) = (
            profile.width as isize,
            profile.height as isize,
            profile.count as isize,
        );
        let mut dataset = match profile.dtype {
            BandType::UInt8 => driver
                .create_with_band_type_with_options::<u8, _>(path, width, height, count, &options)?,
            BandType::Float32 => driver
                .create_with_band_type_with_options::<f32, _>(path, width, height, count, &options)?,
        };

        dataset.set_geo_transform(&profile.geo_transform)?;
        if !profile.crs.is_empty() {
            dataset.set_projection(&profile.crs)?;
        }

        Ok(GdalWriter {
            dataset,
            path: path.to_path_buf(),
            profile: profile.clone(),
        })
    }
}

impl RasterReader for GdalReader {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_band(&self, index: usize) -> BurnResult<Array2<f32>> {
        check_band_index(index, self.info.band_count, &self.info.name)?;

        let (width, height) = (self.info.width, self.info.height);
        let rasterband = self.dataset.rasterband(index as isize)?;
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        Array2::from_shape_vec((height, width), band_data.data).map_err(|e| {
            BurnError::Processing(format!("Failed to reshape band {} of {}: {}", index, self.info.name, e))
        })
    }
}

impl RasterWriter for GdalWriter {
    fn write_band(&mut self, index: usize, data: &BandData) -> BurnResult<()> {
        let name = self.path.display().to_string();
        check_band_index(index, self.profile.count, &name)?;

        let (height, width) = data.dim();
        if (width, height) != (self.profile.width, self.profile.height) {
            return Err(BurnError::Processing(format!(
                "Band shape {}x{} does not match raster {} ({}x{})",
                width, height, name, self.profile.width, self.profile.height
            )));
        }

        let mut rasterband = self.dataset.rasterband(index as isize)?;
        match data {
            BandData::Float32(array) => {
                let buffer = Buffer::new((width, height), array.iter().cloned().collect());
                rasterband.write((0, 0), (width, height), &buffer)?;
            }
            BandData::UInt8(array) => {
                let buffer = Buffer::new((width, height), array.iter().cloned().collect());
                rasterband.write((0, 0), (width, height), &buffer)?;
            }
        }

        if let Some(no_data) = self.profile.no_data {
            rasterband.set_no_data_value(Some(no_data))?;
        }
        Ok(())
    }
}

fn check_band_index(index: usize, count: usize, name: &str) -> BurnResult<()> {
    if index == 0 || index > count {
        return Err(BurnError::Processing(format!(
            "Band {} out of range for {} ({} band(s))",
            index, name, count
        )));
    }
    Ok(())
}
