use clap::{Parser, Subcommand};
use mdg::assets::StyleAsset;
use mdg::config::{self, BuildConfig, Overrides};
use mdg::{output, pipeline, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdg")]
#[command(version)]
#[command(about = "Convert a directory of markdown files into styled HTML pages")]
#[command(long_about = "\
Convert a directory of markdown files into styled HTML pages

Every .md / .markdown file in the source directory becomes html/<name>.html
in the working directory. Each page starts with a UTF-8 charset tag and the
GitHub markdown stylesheet, followed by a menu linking all converted pages
(omitted with -m, or when there are more than 40 files) and the rendered
document. Existing pages of the same name are replaced.

Settings can also live in an mdg.toml in the source directory; run
'mdg gen-config' for a documented example. Flags win over the file.

Exit status is 1 when any file failed to convert.")]
struct Cli {
    /// Directory holding the markdown files
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Convert a single markdown file instead of a directory
    #[arg(short, long, conflicts_with = "dir")]
    file: Option<PathBuf>,

    /// Skip generating the navigation menu
    #[arg(short = 'm', long)]
    skip_menu: bool,

    /// Maximum number of files processed at the same time [default: 12]
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Output directory, relative to the working directory [default: html]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stylesheet to inject instead of the built-in one
    #[arg(long)]
    style: Option<PathBuf>,

    /// Config file [default: <dir>/mdg.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock mdg.toml with all options documented
    GenConfig,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            output_dir: self.output.clone(),
            skip_menu: self.skip_menu.then_some(true),
            style: self.style.clone(),
            concurrency: self.concurrency,
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let source_dir = match &cli.file {
        Some(file) => parent_dir(file),
        None => cli.dir.clone(),
    };

    let settings = config::load_config(cli.config.as_deref(), &source_dir)?.apply(&cli.overrides())?;
    let work_dir = std::env::current_dir()?;
    let build = BuildConfig::resolve(&settings, &work_dir);
    let style = StyleAsset::load(settings.style_path())?;

    let manifest = match &cli.file {
        Some(file) => scan::single_file(file, &build.extensions)?,
        None => scan::scan(&source_dir, &build.extensions)?,
    };

    if manifest.is_empty() {
        println!(
            "{}",
            output::format_empty_manifest(&source_dir, &build.extensions)
        );
        return Ok(ExitCode::SUCCESS);
    }

    let report = pipeline::run(&build, &manifest, &style)?;
    output::print_run_summary(&report, &build);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Route logs to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mdg={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
