use clap::{Parser, Subcommand};
use rusarchives::{config, generate, group, output, store, temples};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::Level;

/// Shared flags for commands that render wiki pages.
#[derive(clap::Args, Clone)]
struct PageArgs {
    /// Heading level of top sections (overrides archives.heading_level)
    #[arg(long)]
    heading_level: Option<usize>,
}

/// Overrides for the `[temples]` config section.
#[derive(clap::Args, Clone)]
struct TempleArgs {
    /// Root name of the pre-1917 hierarchy
    #[arg(long)]
    old_name: Option<String>,
    /// Root name of the present-day hierarchy
    #[arg(long)]
    modern_name: Option<String>,
    /// Page name prefix of the pre-1917 hierarchy
    #[arg(long)]
    old_prefix: Option<String>,
    /// Page name prefix of the present-day hierarchy
    #[arg(long)]
    modern_prefix: Option<String>,
    /// Page name prefix of temple pages
    #[arg(long)]
    temple_prefix: Option<String>,
    /// Keep " (...)" suffixes of region names
    #[arg(long)]
    no_strip_in_brackets: bool,
}

impl TempleArgs {
    fn apply(self, config: &mut config::TemplesConfig) {
        let overrides = [
            (self.old_name, &mut config.old_name),
            (self.modern_name, &mut config.modern_name),
            (self.old_prefix, &mut config.old_prefix),
            (self.modern_prefix, &mut config.modern_prefix),
            (self.temple_prefix, &mut config.temple_prefix),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if self.no_strip_in_brackets {
            config.strip_in_brackets = false;
        }
    }
}

#[derive(Parser)]
#[command(name = "rusarchives")]
#[command(about = "Archive catalog store and wiki page generator")]
#[command(long_about = "\
Archive catalog store and wiki page generator

Groups search results scraped from the archive catalog into a sharded JSON
store, and renders the store and the temple registry as wiki pages.

Store layout:

  store/
  ├── list.json                          # archive titles
  └── archive<sha3-256 of title>/
      ├── list.json                      # {funds, title}
      └── fund<number>/
          ├── list.json                  # {annotation, inventories, number}
          └── inventory<number>.json     # {annotation, items, number}

Run 'rusarchives gen-config' to generate a documented rusarchives.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding rusarchives.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log more (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Group a directory of <id>_<kind>.json detail files into a store
    Group {
        input_dir: PathBuf,
        output_dir: PathBuf,
        /// Record the details page link on each item
        #[arg(long)]
        save_url: bool,
    },
    /// Write the page of one archive and an inline page per fund
    GenerateArchive {
        input_dir: PathBuf,
        archive_name: String,
        output_dir: PathBuf,
        #[command(flatten)]
        pages: PageArgs,
    },
    /// Write a page for every archive, fund, inventory and item
    GenerateArchives {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        pages: PageArgs,
    },
    /// Rename archives from a JSON {"old title": "new title"} map
    Rename {
        input_dir: PathBuf,
        rename_file: PathBuf,
        output_dir: PathBuf,
    },
    /// Write temple and region hierarchy pages from a region file
    GenerateTemples {
        input_file: PathBuf,
        output_dir: PathBuf,
        output_list_file: PathBuf,
        #[command(flatten)]
        temples: TempleArgs,
    },
    /// Print a stock rusarchives.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config_dir,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let load_config = || config::load_config(&config_dir);

    match command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Group {
            input_dir,
            output_dir,
            save_url,
        } => {
            let config = load_config()?;
            init_thread_pool(&config.processing);
            let details_url = (save_url || config.archives.save_url)
                .then_some(config.archives.details_url.as_str());
            let mut list = group::group(&input_dir, details_url)?;
            store::write(&mut list, &output_dir)?;
            output::print_tree_output(&list, &output_dir);
        }
        Command::GenerateArchive {
            input_dir,
            archive_name,
            output_dir,
            pages,
        } => {
            let heading_level = resolve_heading_level(&pages, &load_config()?)?;
            let mut list = store::read(&input_dir)?;
            let written =
                generate::generate_archive_pages(&mut list, &archive_name, &output_dir, heading_level)?;
            output::print_generate_output(written, &output_dir);
        }
        Command::GenerateArchives {
            input_dir,
            output_dir,
            pages,
        } => {
            let heading_level = resolve_heading_level(&pages, &load_config()?)?;
            let mut list = store::read(&input_dir)?;
            let written = generate::generate_archives_pages(&mut list, &output_dir, heading_level)?;
            output::print_generate_output(written, &output_dir);
        }
        Command::Rename {
            input_dir,
            rename_file,
            output_dir,
        } => {
            let renames: BTreeMap<String, String> = store::read_json(&rename_file)?;
            let mut list = store::read(&input_dir)?;
            let applied = list.apply_renames(&renames)?;
            store::write(&mut list, &output_dir)?;
            output::print_rename_output(&applied, &output_dir);
        }
        Command::GenerateTemples {
            input_file,
            output_dir,
            output_list_file,
            temples: overrides,
        } => {
            let mut config = load_config()?;
            overrides.apply(&mut config.temples);
            config.validate()?;
            let summary = temples::generate_temples_pages(
                &input_file,
                &output_dir,
                &output_list_file,
                &config.temples,
            )?;
            output::print_temples_output(&summary, &output_dir, &output_list_file);
        }
    }

    Ok(())
}

/// Send diagnostics to stderr; stdout is reserved for command summaries.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the heading level from the flag or config, validated like config.
fn resolve_heading_level(
    pages: &PageArgs,
    config: &config::Config,
) -> Result<usize, config::ConfigError> {
    let mut archives = config.archives.clone();
    if let Some(level) = pages.heading_level {
        archives.heading_level = level;
    }
    let checked = config::Config {
        archives,
        ..config.clone()
    };
    checked.validate()?;
    Ok(checked.archives.heading_level)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can lower the
/// thread count, never raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
