// demos/archive_region.rs
//
// Usage: archive_region [archive root] [boundary.geojson]
// The root is a local copy of the archive (`zarr` feature) or an s3:// URL (`s3`
// feature, defaults to the public archive bucket). Without either feature the demo only
// prints the planned group paths.
use aoiclimate::{ArchiveLoader, RegionSelector};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let root = args.next();
    let boundary = args.next().map(PathBuf::from);

    let loader = match root.as_deref() {
        Some(root) => ArchiveLoader::new(root),
        None => ArchiveLoader::default(),
    };
    let plan = loader.plan(&["tas", "pr"], &["historical", "projection"])?;
    for group in plan.groups() {
        println!("{:>4} {:<10} {}", group.variable, group.scenario, group.path);
    }

    #[cfg(feature = "zarr")]
    {
        let merged = if loader.base().starts_with("s3://") {
            #[cfg(feature = "s3")]
            {
                plan.materialize(&aoiclimate::S3GroupStore::from_env()?)?
            }
            #[cfg(not(feature = "s3"))]
            {
                println!("Build with --features s3 to read from S3.");
                return Ok(());
            }
        } else {
            plan.materialize(&aoiclimate::ZarrGroupStore::new("."))?
        };
        println!("Merged {} variables", merged.variable_count());

        if let Some(path) = boundary {
            let region = RegionSelector::from_geojson_file(&path)?;
            let clipped = region.clip(&merged)?;
            for (name, values) in clipped.coords() {
                println!("{name}: {} values", values.len());
            }
        }
    }
    #[cfg(not(feature = "zarr"))]
    {
        if let Some(path) = boundary {
            let region = RegionSelector::from_geojson_file(&path)?;
            println!(
                "Boundary has {} polygon(s) in {}",
                region.polygons().0.len(),
                region.crs()
            );
        }
        println!("Build with --features zarr (local copy) or s3 to read the groups.");
    }

    Ok(())
}
