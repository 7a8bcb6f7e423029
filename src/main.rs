use clap::{Parser, Subcommand};
use imageforge::ai::{
    self, AiCompressionRequest, DpiSuggestionRequest, HttpSuggestionService, RelatedImageRequest,
    SuggestionService, data_uri,
};
use imageforge::batch::{self, BatchJob, BatchPolicy, BatchTransform, CancelToken};
use imageforge::context::{AppContext, Preferences, Theme};
use imageforge::imaging::{
    CompressionReport, CropRegion, Dimensions, ImageBackend, MergeDirection, OutputFormat,
    PrintSize, Quality, ResizeTarget, RustBackend, SourceFile, SourceFormat, compress_image,
    convert_image, crop_image, merge_images, resize_image, with_decoded_image,
};
use imageforge::upload::{self, Tool, UploadError};
use imageforge::{config, naming, output, presets};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imageforge")]
#[command(version)]
#[command(about = "Resize, convert, compress, crop, merge and bulk-process images")]
#[command(long_about = "\
Resize, convert, compress, crop, merge and bulk-process images

Everything runs locally except `dpi`, `enhance` and `compress --ai`, which
ask an OpenAI-compatible API (key read from $OPENAI_API_KEY by default).

Outputs are written next to the input unless --output is given. Nothing is
written when an operation fails.

Run 'imageforge gen-config' to generate a documented imageforge.toml.
Set IMAGEFORGE_LOG=debug for diagnostics on stderr.")]
struct Cli {
    /// Config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Exactly one way of choosing the new size.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct ResizeTo {
    /// New width; height follows the aspect ratio
    #[arg(long)]
    width: Option<u32>,
    /// New height; width follows the aspect ratio
    #[arg(long)]
    height: Option<u32>,
    /// Exact size, aspect ratio not kept
    #[arg(long, value_name = "WxH")]
    size: Option<Dimensions>,
    /// Named size (see `imageforge presets`)
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Resize one image, keeping its format
    Resize {
        input: PathBuf,
        #[command(flatten)]
        to: ResizeTo,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Convert one image (or the first page of a PDF) to another format
    Convert {
        input: PathBuf,
        /// jpeg, png, webp, gif or pdf [default: from config]
        #[arg(long)]
        to: Option<OutputFormat>,
        /// 0-100, for lossy formats [default: from config]
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        quality: Option<u32>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Compress one image or PDF page to JPEG
    Compress {
        input: PathBuf,
        /// 0-100 [default: from config]
        #[arg(long, conflicts_with = "ai", value_parser = clap::value_parser!(u32).range(0..=100))]
        quality: Option<u32>,
        /// Let the AI model pick the quality
        #[arg(long)]
        ai: bool,
        /// Report sizes without writing the file
        #[arg(long)]
        dry_run: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Cut a rectangle out of one image
    Crop {
        input: PathBuf,
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Join images side by side or stacked into one PNG
    Merge {
        #[arg(num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,
        /// horizontal or vertical [default: from config]
        #[arg(long)]
        direction: Option<MergeDirection>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Convert or resize many images (files or directories) into one ZIP
    Bulk {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Target format [default: from config]
        #[arg(long)]
        to: Option<OutputFormat>,
        /// Resize to this width, keeping aspect ratio
        #[arg(long, conflicts_with = "size")]
        width: Option<u32>,
        /// Resize to exactly this size
        #[arg(long, value_name = "WxH")]
        size: Option<Dimensions>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        quality: Option<u32>,
        /// Skip broken images instead of aborting
        #[arg(long)]
        best_effort: bool,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the named resize presets
    Presets,
    /// Ask the AI model for a print DPI
    Dpi {
        input: PathBuf,
        /// Print size in inches
        #[arg(long, value_name = "WxH", value_parser = parse_print_size)]
        print: PrintSize,
        /// Current DPI of the image [default: 72]
        #[arg(long)]
        current_dpi: Option<u32>,
    },
    /// Generate a related image with the AI model
    Enhance {
        input: PathBuf,
        /// Extra instructions for the model
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show or change saved preferences
    Prefs {
        #[arg(long)]
        theme: Option<Theme>,
        /// Forget every saved preference
        #[arg(long, conflicts_with = "theme")]
        reset: bool,
    },
    /// Print a stock imageforge.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let mut ctx = AppContext::load(&config_path)?;
    init_thread_pool(&ctx.config.processing);
    let backend = RustBackend::new();
    let max_bytes = ctx.config.upload.max_file_bytes;

    match cli.command {
        Command::Resize { input, to, output } => {
            let file = load_one(Tool::Resize, &input, max_bytes)?;
            let target = resize_target(&to)?;
            let result = resize_image(&backend, &file, target)?;
            let path = save(&result.bytes, &output_path(&input, output, &result.file_name))?;
            output::print_lines(&output::format_saved(&result, &path));
        }
        Command::Convert {
            input,
            to,
            quality,
            output,
        } => {
            let file = load_one(Tool::Convert, &input, max_bytes)?;
            let format = to.unwrap_or_else(|| ctx.output_format());
            let quality = ctx.requested_quality(quality);
            let lossy_quality = format.is_lossy().then_some(quality);
            let result = convert_image(&backend, &file, format, lossy_quality)?;
            let path = save(&result.bytes, &output_path(&input, output, &result.file_name))?;
            output::print_lines(&output::format_saved(&result, &path));
            remember(&mut ctx, format, quality)?;
        }
        Command::Compress {
            input,
            quality,
            ai,
            dry_run,
            output,
        } => {
            let file = load_one(Tool::Compress, &input, max_bytes)?;
            let file_name = format!("{}_compressed.jpg", naming::stem(&file.name));
            let (bytes, report, details) = if ai {
                let service = HttpSuggestionService::from_config(&ctx.config.ai)?;
                let request = AiCompressionRequest {
                    image_data_uri: model_data_uri(&backend, &file)?,
                    compression_level: None,
                };
                let response = ai::compress_image_with_ai(&service, &backend, &request)?;
                let bytes = data_uri::decode(&response.compressed_image_data_uri)?.bytes;
                // Report against the file on disk, not the PNG sent for PDFs.
                let report = CompressionReport {
                    original_bytes: file.len(),
                    ..response.report
                };
                (bytes, report, Some(response.optimization_details))
            } else {
                let quality = ctx.requested_quality(quality);
                let compressed = compress_image(&backend, &file, quality)?;
                (compressed.output.bytes, compressed.report, None)
            };

            if dry_run {
                println!("{} (not written)", file_name);
            } else {
                let path = save(&bytes, &output_path(&input, output, &file_name))?;
                println!("Saved {}", path.display());
            }
            output::print_lines(&output::format_compression_report(&report));
            if let Some(details) = details {
                println!("    {}", details);
            }
        }
        Command::Crop {
            input,
            x,
            y,
            width,
            height,
            output,
        } => {
            let file = load_one(Tool::Crop, &input, max_bytes)?;
            let region = CropRegion {
                x,
                y,
                width,
                height,
            };
            let result = crop_image(&backend, &file, region)?;
            let path = save(&result.bytes, &output_path(&input, output, &result.file_name))?;
            output::print_lines(&output::format_saved(&result, &path));
        }
        Command::Merge {
            inputs,
            direction,
            output,
        } => {
            let files = upload::load_inputs(Tool::Merge, &inputs, max_bytes)?;
            let direction = direction.unwrap_or(ctx.config.merge.direction);
            let result = merge_images(&backend, &files, direction, &ctx.config.merge.file_name)?;
            let path = save(&result.bytes, &standalone_path(output, &result.file_name))?;
            output::print_lines(&output::format_saved(&result, &path));
        }
        Command::Bulk {
            inputs,
            to,
            width,
            size,
            quality,
            best_effort,
            output,
        } => {
            let files = upload::load_inputs(Tool::Bulk, &inputs, max_bytes)?;
            let format = to.unwrap_or_else(|| ctx.output_format());
            let quality = ctx.requested_quality(quality);
            let transform = match (width, size) {
                (Some(width), _) => BatchTransform::Resize { width },
                (None, Some(dims)) => BatchTransform::Exact(dims),
                (None, None) => BatchTransform::Convert,
            };
            let policy = if best_effort {
                BatchPolicy::BestEffort
            } else {
                ctx.config.batch.policy
            };
            let lossy_quality = format.is_lossy().then_some(quality);
            let job = BatchJob::for_files(files, format, lossy_quality, transform);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_lines(&output::format_batch_event(&event));
                }
            });
            let result = batch::run(&backend, job, policy, &CancelToken::new(), Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;

            let outcome = result?;
            let zip = outcome.to_archive()?;
            let archive_path = standalone_path(output, &ctx.config.batch.archive_name);
            let path = save(&zip, &archive_path)?;
            output::print_lines(&output::format_batch_summary(&outcome, &path, zip.len()));
            remember(&mut ctx, format, quality)?;
        }
        Command::Presets => {
            output::print_lines(&output::format_presets());
        }
        Command::Dpi {
            input,
            print,
            current_dpi,
        } => {
            let file = load_one(Tool::Dpi, &input, max_bytes)?;
            let dims = with_decoded_image(&backend, &file, |image| Ok(image.dimensions()))?;
            let service = HttpSuggestionService::from_config(&ctx.config.ai)?;
            let request =
                DpiSuggestionRequest::new(model_data_uri(&backend, &file)?, current_dpi, print);
            let suggestion = service.suggest_dpi(&request)?;
            output::print_lines(&output::format_dpi(&suggestion, dims, print));
        }
        Command::Enhance {
            input,
            prompt,
            output,
        } => {
            let file = load_one(Tool::Enhance, &input, max_bytes)?;
            let service = HttpSuggestionService::from_config(&ctx.config.ai)?;
            let request = RelatedImageRequest {
                source_image: model_data_uri(&backend, &file)?,
                prompt,
            };
            let related = data_uri::decode(&service.generate_related(&request)?.related_image)?;
            let extension = SourceFormat::from_mime(&related.mime)
                .map(|f| f.raster_output().extension())
                .unwrap_or("png");
            let file_name = format!("{}_related.{}", naming::stem(&file.name), extension);
            let path = save(&related.bytes, &output_path(&input, output, &file_name))?;
            println!("Saved {}", path.display());
        }
        Command::Prefs { theme, reset } => {
            if reset {
                ctx.preferences = Preferences::default();
            }
            if let Some(theme) = theme {
                ctx.preferences.theme = theme;
            }
            if reset || theme.is_some() {
                ctx.save_preferences()?;
            }
            output::print_lines(&output::format_preferences(
                &ctx.preferences,
                ctx.preferences_path(),
            ));
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the stderr log subscriber. `IMAGEFORGE_LOG` takes `RUST_LOG` syntax.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("IMAGEFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn load_one(tool: Tool, path: &Path, max_bytes: u64) -> Result<SourceFile, UploadError> {
    upload::load_inputs(tool, &[path.to_path_buf()], max_bytes)?
        .into_iter()
        .next()
        .ok_or(UploadError::NoFiles)
}

fn resize_target(to: &ResizeTo) -> Result<ResizeTarget, String> {
    if let Some(width) = to.width {
        return Ok(ResizeTarget::Width(width));
    }
    if let Some(height) = to.height {
        return Ok(ResizeTarget::Height(height));
    }
    if let Some(dims) = to.size {
        return Ok(ResizeTarget::Exact(dims));
    }
    let name = to.preset.as_deref().unwrap_or_default();
    presets::find(name)
        .map(|preset| ResizeTarget::Exact(preset.dimensions()))
        .ok_or_else(|| format!("unknown preset '{name}' (see `imageforge presets`)"))
}

/// Image as a data URI for the model. PDFs are sent as their rendered first page.
fn model_data_uri(
    backend: &impl ImageBackend,
    file: &SourceFile,
) -> Result<String, Box<dyn std::error::Error>> {
    let is_pdf = file
        .mime
        .as_deref()
        .and_then(SourceFormat::from_mime)
        .is_some_and(|f| f == SourceFormat::Pdf);
    if !is_pdf {
        let mime = file.mime.as_deref().unwrap_or("application/octet-stream");
        return Ok(data_uri::encode(mime, &file.bytes));
    }
    let page = convert_image(backend, file, OutputFormat::Png, None)?;
    Ok(data_uri::encode(OutputFormat::Png.mime_type(), &page.bytes))
}

/// `--output` if given (a directory gets `file_name` appended), else next to `input`.
fn output_path(input: &Path, explicit: Option<PathBuf>, file_name: &str) -> PathBuf {
    match explicit {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(file_name),
    }
}

/// Like [`output_path`] for outputs with several inputs; defaults to the
/// working directory.
fn standalone_path(explicit: Option<PathBuf>, file_name: &str) -> PathBuf {
    output_path(Path::new(file_name), explicit, file_name)
}

fn save(bytes: &[u8], path: &Path) -> std::io::Result<PathBuf> {
    std::fs::write(path, bytes)?;
    Ok(path.to_path_buf())
}

fn remember(
    ctx: &mut AppContext,
    format: OutputFormat,
    quality: Quality,
) -> Result<(), config::ConfigError> {
    let prefs = &ctx.preferences;
    if prefs.last_format == Some(format) && prefs.last_quality == Some(quality.value()) {
        return Ok(());
    }
    ctx.remember_output(format, quality);
    ctx.save_preferences()
}

fn parse_print_size(s: &str) -> Result<PrintSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT in inches, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0)
            .ok_or_else(|| format!("invalid print dimension '{v}'"))
    };
    Ok(PrintSize {
        width: parse(w)?,
        height: parse(h)?,
    })
}
