use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use handcv_cv::{Operation, Rotation, VisionConfig};
use std::path::PathBuf;

mod commands;

/// Run vision operations on image files
#[derive(Debug, Parser)]
#[command(name = "handcv", version)]
struct Cli {
    /// JSON configuration file; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the camera-frame preset (BGRA, 64-byte rows) when no config is given
    #[arg(long, global = true)]
    camera: bool,

    /// Vision backend
    #[arg(long, global = true, value_enum, default_value_t = Backend::Imageproc)]
    backend: Backend,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Imageproc,
    #[cfg(feature = "opencv")]
    Opencv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Turn {
    Cw,
    Ccw,
    Half,
}

impl From<Turn> for Rotation {
    fn from(turn: Turn) -> Self {
        match turn {
            Turn::Cw => Rotation::Clockwise,
            Turn::Ccw => Rotation::CounterClockwise,
            Turn::Half => Rotation::Half,
        }
    }
}

/// Options shared by the image commands
#[derive(Debug, clap::Args)]
struct ImageArgs {
    /// Input image
    input: PathBuf,

    /// Where to write the output image
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Turn the input before processing
    #[arg(long, value_enum)]
    rotate: Option<Turn>,

    /// Print the structured result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the vision library version
    Version,
    /// Convert to grayscale
    Gray(ImageArgs),
    /// Find a template inside the input
    Match {
        #[command(flatten)]
        image: ImageArgs,
        /// Template image
        template: PathBuf,
        /// Write the score heat map instead of the annotated input
        #[arg(long)]
        heat_map: bool,
    },
    /// Mark feature points
    Keypoints(ImageArgs),
    /// Outline the hand
    Hand(ImageArgs),
    /// Print the effective configuration
    DumpConfig,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> Result<VisionConfig> {
    match &cli.config {
        Some(path) => VisionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path)),
        None if cli.camera => Ok(VisionConfig::camera_frames()),
        None => Ok(VisionConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    let (op, args, template, heat_map) = match cli.command {
        Command::Version => return commands::print_version(cli.backend.into(), config),
        Command::DumpConfig => {
            println!("{}", config.to_json()?);
            return Ok(());
        }
        Command::Gray(args) => (Operation::Grayscale, args, None, false),
        Command::Keypoints(args) => (Operation::Keypoints, args, None, false),
        Command::Hand(args) => (Operation::Hand, args, None, false),
        Command::Match {
            image,
            template,
            heat_map,
        } => (Operation::Match, image, Some(template), heat_map),
    };

    let request = commands::Request {
        operation: op,
        input: args.input,
        template,
        output: args.output,
        rotation: args.rotate.map(Rotation::from),
        heat_map,
        json: args.json,
    };
    commands::execute(cli.backend.into(), config, &request)
}

impl From<Backend> for commands::BackendChoice {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Imageproc => commands::BackendChoice::Imageproc,
            #[cfg(feature = "opencv")]
            Backend::Opencv => commands::BackendChoice::OpenCv,
        }
    }
}
