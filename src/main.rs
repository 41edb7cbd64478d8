use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};
use std::process;
use log::error;

use tilemosaic::utils::logger::{Logger, DEFAULT_LOG_FILE};
use tilemosaic::commands::{CommandFactory, TilemosaicCommandFactory};

fn main() {
    let matches = ClapCommand::new("tilemosaic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build georeferenced GeoTIFF mosaics from XYZ map tiles")
        .arg(
            Arg::new("path")
                .help("Output file, or the input file with --info")
                .required_unless_present("list-providers")
                .index(1),
        )
        .arg(
            Arg::new("bbox")
                .long("bbox")
                .help("Bounding box in WGS84 degrees (west,south,east,north)")
                .value_name("W,S,E,N")
                .allow_hyphen_values(true)
                .required(false),
        )
        .arg(
            Arg::new("zoom")
                .short('z')
                .long("zoom")
                .help("Tile zoom level")
                .value_name("LEVEL")
                .value_parser(value_parser!(u8))
                .conflicts_with("resolution"),
        )
        .arg(
            Arg::new("resolution")
                .short('r')
                .long("resolution")
                .help("Ground resolution in metres per pixel at the equator")
                .value_name("METRES")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .help("Provider name (see --list-providers) or URL template with {z}/{x}/{y}")
                .value_name("SOURCE"),
        )
        .arg(
            Arg::new("crs")
                .long("crs")
                .help("Target CRS of the output, e.g. EPSG:4326")
                .value_name("CRS"),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("GeoTIFF compression (none, deflate, zstd)")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("resampling")
                .long("resampling")
                .help("Resampling used when reprojecting (nearest, bilinear)")
                .value_name("METHOD"),
        )
        .arg(
            Arg::new("cog")
                .long("cog")
                .help("Rewrite the output as a Cloud Optimized GeoTIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Replace an existing output file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("image-only")
                .long("image-only")
                .help("Save the cropped image as PNG/JPEG instead of a GeoTIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML file with [fetch], [output] and [providers] tables")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .help("Summarize the structure of an existing GeoTIFF")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-providers")
                .long("list-providers")
                .help("List the named tile providers")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Hide the progress bar")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if let Err(e) = Logger::init_global_logger(DEFAULT_LOG_FILE, matches.get_flag("verbose"), true) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = TilemosaicCommandFactory::new();

    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            process::exit(1);
        }
    }
}
