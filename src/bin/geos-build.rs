//! geos-build CLI - fetch, patch, and build GEOS releases
//!
//! Usage:
//!   geos-build download 3.11.1 --root ./work
//!   geos-build extract 3.11.1 --root ./work
//!   geos-build build 3.11.1 --install-dir /opt/libgeos --jobs 8

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geos_build::{GeosSource, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geos-build")]
#[command(about = "Download, patch, and build the GEOS geometry library from source")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working root directory (a temporary directory if not specified)
    #[arg(short, long, global = true, env = "GEOS_BUILD_ROOT")]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the release source archive into the root
    Download {
        /// Release version, e.g. 3.11.1
        version: String,
    },

    /// Download (if needed) and extract the patched source tree
    Extract {
        /// Release version, e.g. 3.11.1
        version: String,

        /// Fail instead of replacing an existing extracted tree
        #[arg(long)]
        keep_existing: bool,
    },

    /// Build and install the library with cmake
    Build {
        /// Release version, e.g. 3.11.1
        version: String,

        /// Installation prefix (default: ~/.local/share/libgeos)
        #[arg(short, long)]
        install_dir: Option<PathBuf>,

        /// Parallel build jobs
        #[arg(short, long, default_value_t = num_cpus::get() as u32)]
        jobs: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Download { version } => {
            let source = persistent_source(&version, cli.root)?;
            output::action(&format!("Downloading geos {}", version));
            source.download()?;
            output::success(&format!(
                "archive ready at {}",
                source.archive_path().display()
            ));
        }

        Commands::Extract {
            version,
            keep_existing,
        } => {
            let source = persistent_source(&version, cli.root)?;
            output::action(&format!("Extracting geos {}", version));
            source.extract(!keep_existing)?;
            output::success(&format!(
                "patched source tree at {}",
                source.source_dir().display()
            ));
        }

        Commands::Build {
            version,
            install_dir,
            jobs,
        } => {
            // A build may run out of a throwaway root; only the install
            // prefix needs to survive.
            let source = match cli.root {
                Some(root) => GeosSource::with_root(&version, root)?,
                None => GeosSource::new(&version)?,
            };
            output::action(&format!("Building geos {}", version));
            source.build(install_dir.as_deref(), jobs)?;
            output::success(&format!("geos {} built and installed", version));
            source.close();
        }
    }

    Ok(())
}

/// Downloads and extractions produce artifacts the caller wants to keep, so
/// they refuse to run out of a temporary root.
fn persistent_source(version: &str, root: Option<PathBuf>) -> Result<GeosSource> {
    let root = root.context(
        "--root is required for this command; without it the artifacts \
         would land in a temporary directory and be removed on exit",
    )?;
    Ok(GeosSource::with_root(version, root)?)
}
