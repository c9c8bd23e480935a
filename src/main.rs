use clap::{Parser, Subcommand};
use shrinkray::batch::Optimizer;
use shrinkray::config::{self, OptimizerConfig};
use shrinkray::types::ConversionPolicy;
use shrinkray::{output, scan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("SHRINKRAY_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("SHRINKRAY_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "shrinkray")]
#[command(about = "Lossless PNG, JPEG and GIF optimizer")]
#[command(long_about = "\
Lossless PNG, JPEG and GIF optimizer

Every image is run through a chain of external compressors and the smallest
result wins. Originals are never modified: optimized files are copied to
<work_dir>/final, mirroring each original's absolute path.

Chains:
  PNG   advpng → pngout → optipng → pngquant → advpng → optipng → pngquant
  JPEG  jpegtran → jfifremove
  GIF   gifsicle, then (policy permitting) two PNG conversions through the PNG chain
  WebP  cwebp -lossless (PNG, JPEG) or gif2webp (still GIFs), with --webp

Results that are not confirmed pixel-identical are flagged for review.

Run 'shrinkray gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct OptimizeArgs {
    /// Image files or directories to optimize
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Format conversion policy: none, all or ie6-safe
    #[arg(long)]
    conversion: Option<ConversionPolicy>,

    /// Also produce a browser-specific WebP alternative
    #[arg(long)]
    webp: bool,

    /// Batch deadline in seconds (0 = unbounded)
    #[arg(long)]
    timeout: Option<u64>,

    /// Directory holding the optimizer binaries
    #[arg(long)]
    binaries: Option<PathBuf>,

    /// Scratch and results directory
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl OptimizeArgs {
    /// Command-line flags win over the config file.
    fn apply(&self, config: &mut OptimizerConfig) {
        if let Some(policy) = self.conversion {
            config.conversion.policy = policy;
        }
        if self.webp {
            config.conversion.webp = true;
        }
        if let Some(seconds) = self.timeout {
            config.timeouts.batch_seconds = seconds;
        }
        if let Some(dir) = &self.binaries {
            config.binaries_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = Some(dir.clone());
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Optimize images and copy smaller versions to the results directory
    Optimize(OptimizeArgs),
    /// List the images that would be optimized
    Check {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Optimize(args) => {
            let mut config = config::load_config(args.config.as_deref())?;
            args.apply(&mut config);
            config.validate()?;

            let files = scan::discover(&args.paths)?;
            let optimizer = Optimizer::new(&config)?;
            let results = optimizer.optimize_all(
                config.conversion.policy,
                config.conversion.webp,
                &files,
            )?;
            if args.json {
                output::print_results_json(&results)?;
            } else {
                output::print_results(&results, optimizer.results_dir());
            }
        }
        Command::Check { paths } => {
            let files = scan::discover(&paths)?;
            output::print_discovered(&files);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
