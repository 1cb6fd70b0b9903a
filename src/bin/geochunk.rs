//! Command-line front end: download-and-partition and bounding-box extract.

use clap::{Parser, Subcommand};
use geochunk::{
    BoundingBox, ChunkIndex, DirectoryStore, ExtractOptions, GeochunkError, MetadataStore,
    Partitioner, ProgressObserver, catalog, extract,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "geochunk", version, about = "Partition large GeoJSON collections into spatially indexed chunks and extract by bounding box")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download footprint data for a location, optionally partitioning it
    Download {
        /// Location name as listed in the remote catalog
        location: String,

        /// Output folder for the downloaded data
        #[arg(long, default_value = "output")]
        output: PathBuf,

        /// Partition into chunks immediately after download
        #[arg(long)]
        divide: bool,

        /// Approximate number of non-empty chunks to aim for
        #[arg(long, default_value_t = geochunk::DEFAULT_TARGET_CHUNK_COUNT)]
        target_chunks: usize,
    },
    /// Extract features intersecting a bounding box from a partitioned folder
    Extract {
        /// Folder containing chunk files and metadata
        #[arg(long)]
        input: PathBuf,

        /// Output GeoJSON file
        #[arg(long, default_value = "cropped.geojson")]
        output_file: PathBuf,

        /// One corner of the query region as LAT,LON
        #[arg(long, value_parser = parse_corner)]
        top_left: Corner,

        /// The opposite corner as LAT,LON (either corner order works)
        #[arg(long, value_parser = parse_corner)]
        bottom_right: Corner,

        /// Give up if extraction runs longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// A latitude/longitude pair as typed on the command line.
#[derive(Debug, Clone, Copy)]
struct Corner {
    lat: f64,
    lon: f64,
}

fn parse_corner(raw: &str) -> Result<Corner, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{raw}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{lon}'"))?;
    Ok(Corner { lat, lon })
}

/// Progress observer that reports stage boundaries through the log.
struct LogProgress;

impl ProgressObserver for LogProgress {
    fn begin(&self, stage: &str, total: usize) {
        log::info!("{stage}: starting ({total} units)");
    }

    fn finish(&self, stage: &str) {
        log::info!("{stage}: done");
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        if let GeochunkError::NoDataForLocation { available, .. } = &e {
            eprintln!("available locations: {}", available.join(", "));
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> geochunk::Result<()> {
    match cli.command {
        Command::Download {
            location,
            output,
            divide,
            target_chunks,
        } => download(&location, &output, divide, target_chunks),
        Command::Extract {
            input,
            output_file,
            top_left,
            bottom_right,
            timeout_secs,
        } => run_extract(&input, &output_file, top_left, bottom_right, timeout_secs),
    }
}

fn download(
    location: &str,
    output: &PathBuf,
    divide: bool,
    target_chunks: usize,
) -> geochunk::Result<()> {
    log::info!("downloading data for {location}");
    let catalog = catalog::fetch_catalog(catalog::DATASET_LINKS_URL)?;
    let links = catalog::links_for_location(&catalog, location)?;
    let collection = catalog::download_location(&links, &LogProgress)?;

    let store = DirectoryStore::create(output)?;
    if divide {
        let metadata =
            Partitioner::new(target_chunks).partition(&collection, location, &store, &LogProgress)?;
        MetadataStore::new(output).save(location, &metadata)?;
        log::info!(
            "partitioned {} features into {} chunks under {}",
            collection.len(),
            metadata.len(),
            output.display()
        );
    } else {
        let path = output.join(format!("{location}.geojson"));
        collection.write_geojson(&path)?;
        log::info!("wrote {} features to {}", collection.len(), path.display());
    }
    Ok(())
}

fn run_extract(
    input: &PathBuf,
    output_file: &PathBuf,
    top_left: Corner,
    bottom_right: Corner,
    timeout_secs: Option<u64>,
) -> geochunk::Result<()> {
    let metadata = MetadataStore::new(input).load()?;
    let index = ChunkIndex::build(&metadata);
    let store = DirectoryStore::open(input);

    let region = BoundingBox::from_corners(
        (top_left.lon, top_left.lat),
        (bottom_right.lon, bottom_right.lat),
    );
    let options = match timeout_secs {
        Some(secs) => ExtractOptions::with_deadline(Instant::now() + Duration::from_secs(secs)),
        None => ExtractOptions::default(),
    };

    let extraction = extract(&index, &store, region, &options, &LogProgress)?;
    if extraction.count == 0 {
        log::info!("no features found in the specified area");
        return Ok(());
    }

    extraction.collection.write_geojson(output_file)?;
    log::info!(
        "extracted {} features to {}",
        extraction.count,
        output_file.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corner() {
        let corner = parse_corner("-1.2921, 36.8219").unwrap();
        assert_eq!(corner.lat, -1.2921);
        assert_eq!(corner.lon, 36.8219);

        assert!(parse_corner("36.8219").is_err());
        assert!(parse_corner("a,b").is_err());
    }

    #[test]
    fn test_cli_requires_extract_flags() {
        let result = Cli::try_parse_from(["geochunk", "extract", "--input", "folder"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_log_filter() {
        use log::Log;

        let logger = env_logger::Builder::new().parse_filters("info").build();
        assert!(logger.enabled(&log::Metadata::builder().level(log::Level::Info).build()));
        assert!(!logger.enabled(&log::Metadata::builder().level(log::Level::Debug).build()));
    }
}
