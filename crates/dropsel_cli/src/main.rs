//! Dropsel CLI
//!
//! Load dropdown configurations, replay scripted interactions against them,
//! and inspect normalized option trees.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dropsel_select::apply_filter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod report;
mod script;
mod session;

use config::ReplayFile;
use session::Session;

#[derive(Parser)]
#[command(name = "dropsel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dropsel dropdown engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the config's script and print the read model after each step
    Replay {
        /// Replay configuration (dropsel.toml)
        #[arg(default_value = "dropsel.toml")]
        config: PathBuf,
    },

    /// Print the normalized and filtered option tree of every dropdown
    Inspect {
        /// Replay configuration (dropsel.toml)
        #[arg(default_value = "dropsel.toml")]
        config: PathBuf,

        /// Search term to filter with
        #[arg(short, long)]
        search: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Replay { config } => cmd_replay(&config),
        Commands::Inspect { config, search } => cmd_inspect(&config, search.as_deref()),
    }
}

fn cmd_replay(path: &Path) -> Result<()> {
    let file = ReplayFile::load(path)?;
    let steps = script::parse_script(&file.script)?;

    if steps.is_empty() {
        warn!("{} has no script steps", path.display());
    }
    info!(
        "Replaying {} steps against {} dropdowns",
        steps.len(),
        file.dropdowns.len()
    );

    let mut session = Session::new(&file);
    for (index, step) in steps.iter().enumerate() {
        let effective = session.apply(step)?;
        println!(
            "#{} {}{}",
            index + 1,
            step,
            if effective { "" } else { "  (no effect)" }
        );
        if let Some(dropdown) = session.get(&step.target) {
            print!("{}", report::render(&step.target, dropdown));
        }
    }

    println!();
    println!("Final state:");
    if let Some(open) = session.last_opened() {
        println!("open instance: {}", open);
    }
    for (name, dropdown) in session.dropdowns() {
        print!("{}", report::render(name, dropdown));
    }
    Ok(())
}

fn cmd_inspect(path: &Path, search: Option<&str>) -> Result<()> {
    let file = ReplayFile::load(path)?;
    let session = Session::new(&file);

    for (name, dropdown) in session.dropdowns() {
        let canonical = dropdown.canonical();
        println!(
            "[{}] {} items, {} options ({})",
            name,
            canonical.len(),
            canonical.option_count(),
            if dropdown.config().content.is_some() {
                "array content"
            } else {
                "declarative children"
            }
        );

        let mut out = String::new();
        report::render_tree(&mut out, canonical, |option| dropdown.view().is_selected(option), None);
        print!("{}", out);

        if let Some(term) = search {
            let filtered = apply_filter(canonical, term);
            println!(
                "  search {:?}: {} of {} options visible",
                term,
                filtered.flat_options.len(),
                canonical.option_count()
            );
            let mut out = String::new();
            report::render_tree(&mut out, &filtered.display_list, |_| false, None);
            print!("{}", out);
        }
    }
    Ok(())
}
