use burnseed::io::raster::{GdalRasterIo, RasterIo, RasterReader, RasterWriter};
use burnseed::io::writer::{output_name, ResultWriter};
use burnseed::types::{
    BandData, BandType, Compression, Product, RasterProfile, SceneRecord, ScenePair,
};
use ndarray::Array2;
use std::path::Path;
use tempfile::TempDir;

const WIDTH: usize = 5;
const HEIGHT: usize = 4;

fn scene_profile() -> RasterProfile {
    RasterProfile {
        width: WIDTH,
        height: HEIGHT,
        count: 10,
        dtype: BandType::Float32,
        geo_transform: [300_000.0, 10.0, 0.0, 6_400_000.0, 0.0, -10.0],
        crs: String::new(),
        no_data: Some(0.0),
        compress: None,
    }
}

fn record(dir: &Path, file_name: &str) -> SceneRecord {
    SceneRecord {
        file_name: file_name.to_string(),
        directory: dir.to_path_buf(),
        tile_id: "T30VVJ".to_string(),
        size_gib: 1.5,
        acquisition_date: "20190401".to_string(),
    }
}

#[test]
fn test_geotiff_band_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("scene.tif");

    let profile = scene_profile();
    let mut writer = GdalRasterIo
        .open_write(&path, &profile)
        .expect("Failed to create GeoTIFF");
    for band in 1..=profile.count {
        let data = Array2::from_shape_fn((HEIGHT, WIDTH), |(r, c)| {
            (band * 100 + r * WIDTH + c) as f32
        });
        writer
            .write_band(band, &BandData::Float32(data))
            .expect("Failed to write band");
    }
    drop(writer);

    let reader = GdalRasterIo.open_read(&path).expect("Failed to open GeoTIFF");
    let info = reader.info();
    assert_eq!(info.band_count, 10);
    assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
    assert_eq!(info.profile.geo_transform, profile.geo_transform);
    assert_eq!(info.profile.no_data, Some(0.0));

    let nir = reader.read_band(7).expect("Failed to read band 7");
    assert_eq!(nir.dim(), (HEIGHT, WIDTH));
    assert_eq!(nir[[0, 0]], 700.0);
    assert_eq!(nir[[3, 4]], 719.0);

    assert!(reader.read_band(11).is_err());
}

#[test]
fn test_burn_seed_written_as_single_band() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let pre_name = "SEN2_20190401_lat57lon366_T30VVJ_ORB080_utm30n_osgb_vmsk_sharp_rad_srefdem_stdsref.tif";
    let post_name = "SEN2_20190501_lat57lon366_T30VVJ_ORB080_utm30n_osgb_vmsk_sharp_rad_srefdem_stdsref.tif";
    let pair = ScenePair {
        pre: record(temp_dir.path(), pre_name),
        post: record(temp_dir.path(), post_name),
    };

    let mut seed = Array2::<u8>::zeros((HEIGHT, WIDTH));
    seed[[1, 1]] = 1;
    seed[[1, 2]] = 1;
    seed[[2, 1]] = 1;

    let raster_io = GdalRasterIo;
    let writer = ResultWriter::new(&raster_io, temp_dir.path());
    let path = writer
        .write_product(&pair, Product::BurnSeed, &scene_profile(), BandData::UInt8(seed))
        .expect("Failed to write burn seed");

    assert_eq!(
        path,
        temp_dir
            .path()
            .join(output_name(pre_name, post_name, Product::BurnSeed).unwrap())
    );
    println!("Burn seed written to {}", path.display());

    let reader = GdalRasterIo.open_read(&path).expect("Failed to open burn seed");
    assert_eq!(reader.info().band_count, 1);
    let band = reader.read_band(1).unwrap();
    assert_eq!(band.sum(), 3.0);
    assert_eq!(band[[1, 2]], 1.0);

    // compression only applies to the seed product
    assert_eq!(Product::BurnSeed.profile_override().compress, Some(Compression::Lzw));
    assert_eq!(Product::DSavi.profile_override().compress, None);
}
