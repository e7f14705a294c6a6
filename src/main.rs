use clap::{Parser, Subcommand, ValueEnum};
use reframe::config::{self, ReframeConfig};
use reframe::imaging::{ImageBackend, RustBackend};
use reframe::naming::parse_extension_list;
use reframe::output;
use reframe::pipeline::{self, LogIndex};
use reframe::relocate::relocate;
use reframe::types::ImageConfig;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "reframe")]
#[command(version)]
#[command(about = "Normalize photos: orient, bound, re-encode, relocate")]
#[command(long_about = "\
Normalize photos: orient, bound, re-encode, relocate

Each source image is rotated upright according to its EXIF orientation,
scaled down to fit the requested bounding box, and re-encoded as JPEG (or
PNG for a .png destination). Sources that already fit, at quality 100 and
with no rotation needed, are left untouched.

Options are layered: stock defaults, then reframe.toml (or --config),
then command-line flags.

Run 'reframe gen-config' to generate a documented reframe.toml.")]
struct Cli {
    /// Options file (defaults to ./reframe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error; RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Output style for results printed on stdout
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Orient, resize and re-encode one image
    Normalize(NormalizeArgs),
    /// Print the orientation, location and capture time of an image
    Exif {
        source: PathBuf,
    },
    /// Move a file into a directory (copy, then delete the source)
    Relocate {
        file: PathBuf,
        dir: PathBuf,
    },
    /// Print a stock reframe.toml with all options documented
    GenConfig,
}

/// Flags for `normalize`. Every flag overrides the options file.
#[derive(clap::Args)]
struct NormalizeArgs {
    /// Source image
    source: PathBuf,
    /// Maximum output width in pixels (0 = unbounded)
    #[arg(long)]
    max_width: Option<u32>,
    /// Maximum output height in pixels (0 = unbounded)
    #[arg(long)]
    max_height: Option<u32>,
    /// Re-encode quality, 0-100
    #[arg(long)]
    quality: Option<u32>,
    /// Extra clockwise rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<i32>,
    /// Destination extension; png writes PNG, anything else JPEG
    #[arg(long)]
    extension: Option<String>,
    /// Comma-separated extensions to write as .jpg
    #[arg(long)]
    convert_to_jpg: Option<String>,
    /// Explicit output file name
    #[arg(long)]
    filename: Option<String>,
    /// Directory for the re-encoded file
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Move the final file into this directory
    #[arg(long)]
    relocate_to: Option<PathBuf>,
    /// Delete everything but the final file
    #[arg(long)]
    discard_superseded: bool,
}

impl NormalizeArgs {
    /// The command-line layer, containing only flags that were given.
    fn overlay(&self) -> toml::Value {
        let mut image = toml::Table::new();
        if let Some(v) = self.max_width {
            image.insert("max_width".into(), i64::from(v).into());
        }
        if let Some(v) = self.max_height {
            image.insert("max_height".into(), i64::from(v).into());
        }
        if let Some(v) = self.quality {
            image.insert("quality".into(), i64::from(v).into());
        }
        if let Some(v) = self.rotation {
            image.insert("rotation".into(), i64::from(v).into());
        }

        let mut output = toml::Table::new();
        if let Some(v) = &self.extension {
            output.insert("extension".into(), v.clone().into());
        }
        if let Some(v) = &self.convert_to_jpg {
            let list: Vec<toml::Value> = parse_extension_list(v)
                .into_iter()
                .map(toml::Value::from)
                .collect();
            output.insert("convert_to_jpg".into(), list.into());
        }
        if let Some(v) = &self.filename {
            output.insert("filename".into(), v.clone().into());
        }
        if let Some(v) = &self.output_dir {
            output.insert("directory".into(), path_value(v));
        }
        if let Some(v) = &self.relocate_to {
            output.insert("relocate_to".into(), path_value(v));
        }
        if self.discard_superseded {
            output.insert("discard_superseded".into(), true.into());
        }

        let mut root = toml::Table::new();
        if !image.is_empty() {
            root.insert("image".into(), image.into());
        }
        if !output.is_empty() {
            root.insert("output".into(), output.into());
        }
        root.into()
    }
}

fn path_value(path: &Path) -> toml::Value {
    path.to_string_lossy().into_owned().into()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first; stderr keeps stdout for results
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Normalize(args) => {
            let file_layer = config::load_config_layer(cli.config.as_deref())?;
            let options: ReframeConfig =
                config::resolve_config(file_layer.into_iter().chain([args.overlay()]))?;

            let image = options.image_config(&args.source);
            let normalize_options = options.normalize_options(&args.source);
            let result = pipeline::normalize(
                &RustBackend::new(),
                &LogIndex,
                &image,
                &normalize_options,
            )?;

            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result.report)?),
                Format::Text => output::print_normalize_report(&args.source, &result.report),
            }
        }
        Command::Exif { source } => {
            let exif = RustBackend::new().read_exif(&source);
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&exif)?),
                Format::Text => output::print_exif(&source, &exif),
            }
        }
        Command::Relocate { file, dir } => {
            let result = relocate(&ImageConfig::new(&file), &dir);
            if let Some(e) = result.error {
                return Err(e.into());
            }
            match cli.format {
                Format::Json => println!(
                    "{}",
                    serde_json::json!({ "from": file, "to": result.config.original })
                ),
                Format::Text => output::print_relocation(&file, &result.config.original),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
