use std::{error::Error, fs, path::PathBuf};

use tracing_subscriber::EnvFilter;
use volume_cells::{
    Orientation, Pipeline, PipelineConfig, SortBy, volume_loader::VolumeLoader,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let directory = PathBuf::from(args.next().unwrap_or_else(|| "dicom".to_string()));
    let config = match args.next() {
        Some(path) => PipelineConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };

    let grid = VolumeLoader::load_from_directory(&directory, SortBy::InstanceNumber)?;
    let output = Pipeline::new(config)?.run(&grid)?;
    print!("{}", output.table);

    let colorized = output.colorize(&mut rand::rng());
    if let Some(image) = colorized.slice_image(grid.dim().0 / 2, Orientation::Axial) {
        image.save("labels.png")?;
    }
    Ok(())
}
