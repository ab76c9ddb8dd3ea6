use crate::io::catalog::SceneName;
use crate::io::raster::{RasterIo, RasterWriter};
use crate::types::{BandData, BurnError, BurnResult, Product, RasterProfile, ScenePair};
use std::path::{Path, PathBuf};

/// Name fields copied into output file names: sensor, date, tile, orbit
const NAME_FIELDS: [usize; 4] = [0, 1, 3, 4];

fn name_stem(file_name: &str) -> BurnResult<String> {
    let name = SceneName::parse(file_name)?;
    NAME_FIELDS
        .iter()
        .map(|&i| {
            name.field(i).ok_or_else(|| {
                BurnError::InvalidSceneName(format!("{} has no field {}", file_name, i))
            })
        })
        .collect::<BurnResult<Vec<_>>>()
        .map(|fields| fields.concat())
}

/// Output file name for one product of a scene pair.
///
/// `SEN2_20190415_x_T30VVJ_ORB080_...` paired with `SEN2_20190510_x_T30VVJ_ORB123_...`
/// gives `SEN220190415T30VVJORB080_SEN220190510T30VVJORB123_<product>.tif`.
pub fn output_name(pre_file: &str, post_file: &str, product: Product) -> BurnResult<String> {
    Ok(format!(
        "{}_{}_{}.tif",
        name_stem(pre_file)?,
        name_stem(post_file)?,
        product.name()
    ))
}

/// Writes pair products into the output directory
pub struct ResultWriter<'a, R: RasterIo> {
    raster_io: &'a R,
    output_dir: PathBuf,
}

impl<'a, R: RasterIo> ResultWriter<'a, R> {
    pub fn new<P: AsRef<Path>>(raster_io: &'a R, output_dir: P) -> Self {
        Self {
            raster_io,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Write one product as a single-band raster.
    ///
    /// `base` is the georeferencing profile of the pre scene; the product's
    /// type, band count and compression are applied on top of it.
    pub fn write_product(
        &self,
        pair: &ScenePair,
        product: Product,
        base: &RasterProfile,
        data: BandData,
    ) -> BurnResult<PathBuf> {
        let path = self
            .output_dir
            .join(output_name(&pair.pre.file_name, &pair.post.file_name, product)?);
        let profile = base.with_override(&product.profile_override());
        if data.band_type() != profile.dtype {
            return Err(BurnError::Processing(format!(
                "{} is written as {} but {} data was supplied",
                product,
                profile.dtype,
                data.band_type()
            )));
        }

        log::debug!("Writing {} ({}) to {}", product, profile.dtype, path.display());
        let mut writer = self.raster_io.open_write(&path, &profile)?;
        writer.write_band(1, &data)?;

        Ok(path)
    }
}
