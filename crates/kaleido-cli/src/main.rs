//! Kaleido command-line interface.
//!
//! Run clone-pattern jobs from TOML configuration files:
//! ```sh
//! kaleido run job.toml
//! kaleido validate job.toml
//! kaleido quantize job.toml --position 0,0,1 --rotation 0,90,0
//! kaleido patterns
//! ```

mod config;
mod elements;
mod runner;

use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use std::path::PathBuf;

use kaleido_core::PatternGeometry;
use kaleido_geometry::RigidPlacement;

#[derive(Parser)]
#[command(name = "kaleido")]
#[command(about = "Kaleido: clone-pattern geometry engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone every element of a job through its pattern.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and build its pattern without cloning.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Snap the job's pattern onto an authored frame and print its node.
    Quantize {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Frame position as x,y,z.
        #[arg(long, value_parser = runner::parse_vector, allow_hyphen_values = true)]
        position: Vector3<f64>,
        /// Frame rotation as Euler angles in degrees, rx,ry,rz.
        #[arg(
            long,
            value_parser = runner::parse_vector,
            allow_hyphen_values = true,
            default_value = "0,0,0"
        )]
        rotation: Vector3<f64>,
    },
    /// Display the supported pattern kinds and their default parameters.
    Patterns,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Kaleido Clone Pattern");
            println!("=====================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;
            println!(
                "Generated {} instances from {} elements ({} skipped)",
                result.instances.len(),
                job.element.len(),
                result.skipped.len()
            );

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_json {
                runner::write_instances_json(&result, &out_dir.join("instances.json"))?;
            }
            if job.output.save_csv {
                runner::write_instances_csv(&result, &out_dir.join("instances.csv"))?;
            }
            if job.output.save_xml {
                runner::write_pattern_xml(&result.pattern, &out_dir.join("pattern.xml"))?;
            }

            println!("Run complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let pattern = job.pattern.build()?;
            println!(
                "Configuration is valid: {} ({} pattern, {} elements, {} instances each)",
                config.display(),
                pattern.kind(),
                job.element.len(),
                job.pattern.instance_count(&pattern)
            );
            Ok(())
        }
        Commands::Quantize {
            config,
            position,
            rotation,
        } => {
            let job = config::load_config(&config)?;
            let authored = RigidPlacement::new(position, rotation);
            let pattern = runner::quantize_pattern(&job, &authored)?;
            println!("{}", pattern.to_xml()?);
            Ok(())
        }
        Commands::Patterns => {
            println!("Available patterns:");
            for node in runner::pattern_catalogue() {
                println!();
                for (name, value) in node.attributes() {
                    println!("    {:<10} {}", name, value);
                }
            }
            Ok(())
        }
    }
}
