//! Optica command-line interface.
//!
//! Run Fourier-optics simulations from TOML job files and netlists:
//! ```sh
//! optica run job.toml
//! optica validate job.toml --netlist beam.txt
//! optica elements
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "optica")]
#[command(about = "Optica: Fresnel propagation through sources, lenses and apertures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Netlist file (overrides config file setting).
        #[arg(short, long)]
        netlist: Option<PathBuf>,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration and its netlist without propagating.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Netlist file (overrides config file setting).
        #[arg(short, long)]
        netlist: Option<PathBuf>,
    },
    /// List the netlist element syntax.
    Elements,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            netlist,
            output,
        } => {
            println!("Optica Fresnel Propagator");
            println!("=========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let netlist_path = runner::resolve_netlist(&job, &config, netlist.as_deref())?;
            println!("Netlist: {}", netlist_path.display());
            let planes = runner::load_planes(&netlist_path)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            let result = runner::run_simulation(&job, planes, &out_dir)?;

            let failed = result.outcomes.iter().filter(|o| !o.is_ok()).count();
            println!(
                "Simulation complete: {} sources ({} failed), {} intermediate fields in {}",
                result.outcomes.len(),
                failed,
                result.emissions_written,
                out_dir.display()
            );
            Ok(())
        }
        Commands::Validate { config, netlist } => {
            let job = config::load_config(&config)?;
            let netlist_path = runner::resolve_netlist(&job, &config, netlist.as_deref())?;
            let planes = runner::load_planes(&netlist_path)?;
            let sim = runner::build_simulation(&job, planes)?;
            println!(
                "Configuration is valid: {} ({} sources, {} masks on a {}x{} mesh)",
                config.display(),
                sim.sources().len(),
                sim.masks().len(),
                sim.mesh().nx(),
                sim.mesh().ny()
            );
            Ok(())
        }
        Commands::Elements => {
            println!("Netlist elements (lengths in mm unless suffixed with mm, um or nm):");
            println!();
            println!("  Sources:");
            println!("    W<name> z wavelength [tilt_deg]   Plane wave, optionally tilted about y");
            println!("    G<name> z wavelength waist        Gaussian beam");
            println!();
            println!("  Masks:");
            println!("    L<name> z focal_length            Thin lens");
            println!("    P<name> z                         Observation plane");
            println!("    C<name> z diameter                Circular aperture");
            println!("    R<name> z width height            Rectangular aperture");
            println!("    S<name> z width                   Square aperture");
            Ok(())
        }
    }
}
