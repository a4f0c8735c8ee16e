use clap::{Arg, ArgAction, Command as ClapCommand};
use log::error;
use std::process;

// Import from your library
use pyramidkit::commands::{CommandFactory, PyramidkitCommandFactory};
use pyramidkit::utils::logger::Logger;

fn main() {
    let matches = ClapCommand::new("PyramidKit")
        .version("0.1")
        .author("Maurice Schilpp")
        .about("Plan and run raster transcodes, overview pyramids and cloud-optimized outputs")
        .arg(
            Arg::new("input")
                .help("Input raster file(s); several inputs are mosaicked")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("run")
                .long("run")
                .help("Execute the build instead of only printing the plan")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pyramid")
                .long("pyramid")
                .help("Only build an overview pyramid for the input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output raster file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for derived output names")
                .value_name("DIR")
                .required(false),
        )
        .arg(
            Arg::new("bbox")
                .long("bbox")
                .help("Crop window (minx,miny,maxx,maxy)")
                .value_name("BBOX")
                .required(false),
        )
        .arg(
            Arg::new("bbox-crs")
                .long("bbox-crs")
                .help("EPSG code of the crop window coordinates")
                .value_name("CODE")
                .default_value("4326")
                .required(false),
        )
        .arg(
            Arg::new("t-srs")
                .long("t-srs")
                .help("Target projection EPSG code for reprojection")
                .value_name("CODE")
                .required(false),
        )
        .arg(
            Arg::new("tr")
                .long("tr")
                .help("Target resolution, one value or \"xres,yres\"")
                .value_name("RES")
                .required(false),
        )
        .arg(
            Arg::new("anisotropic")
                .long("anisotropic")
                .help("Estimate X resolution independently of Y")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("resampling")
                .short('r')
                .long("resampling")
                .help("Resampling algorithm (nearest, bilinear, cubic, average, ...)")
                .value_name("ALG")
                .required(false),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .help("Output compression (DEFLATE, LZW, ZSTD, JPEG, ...)")
                .value_name("NAME")
                .required(false),
        )
        .arg(
            Arg::new("nodata")
                .long("nodata")
                .help("Destination nodata value, or \"default\" for the engine's choice")
                .value_name("VALUE")
                .required(false),
        )
        .arg(
            Arg::new("overviews")
                .long("overviews")
                .help("Overview plan (auto, none, existing, external, single, multi, internal)")
                .value_name("PLAN")
                .required(false),
        )
        .arg(
            Arg::new("ovr-count")
                .long("ovr-count")
                .help("Overview level count; negative reuses the last N source levels")
                .value_name("N")
                .allow_hyphen_values(true)
                .required(false),
        )
        .arg(
            Arg::new("base-level")
                .long("base-level")
                .help("Source overview level to treat as the base raster")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("cog")
                .long("cog")
                .help("Produce a cloud-optimized output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("align")
                .long("align")
                .help("Snap the output extent outward onto the resolution grid")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("split")
                .long("split")
                .help("Split the output into an NxN tile grid")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("if-exists")
                .long("if-exists")
                .help("What to do when the target exists (skip, overwrite, fail)")
                .value_name("POLICY")
                .default_value("skip")
                .required(false),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Shorthand for --if-exists overwrite")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-sidecars")
                .long("no-sidecars")
                .help("Skip writing the .info and run-log sidecars")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .help("TOML file overriding the planning policy constants")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .help("Engine worker thread count")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("cache-mb")
                .long("cache-mb")
                .help("Engine cache budget in megabytes")
                .value_name("MB")
                .required(false),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress the progress bar")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_file = "pyramidkit.log";
    let logger = match Logger::new(log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger("pyramidkit-global.log") {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = PyramidkitCommandFactory::new();

    let command_result = factory.create_command(&matches, &logger);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
