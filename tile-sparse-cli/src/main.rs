//! tsparse CLI - Encode safetensors weights into tile-grouped block-sparse form.

use clap::{Parser, Subcommand};

mod common;
mod config;
mod encode;
mod inspect;

#[derive(Parser)]
#[command(name = "tsparse")]
#[command(about = "CLI tool for encoding dense weights into tile-friendly block-sparse layouts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode 2-D tensors of a SafeTensors model
    Encode {
        /// Path to the model file or folder
        #[arg(short, long)]
        model: String,

        /// Path to encode config JSON
        #[arg(short, long)]
        config: Option<String>,

        /// Output directory for encoded tensors
        #[arg(short, long)]
        output: Option<String>,

        /// Generate a template config instead of encoding
        #[arg(long)]
        generate_config: bool,
    },

    /// Report block sparsity of every 2-D tensor without writing anything
    Inspect {
        /// Path to the model file or folder
        #[arg(short, long)]
        model: String,

        /// Micro-row chunk height used for tile statistics
        #[arg(long, default_value_t = tile_sparse::DEFAULT_MICRO_ROWS)]
        micro_rows: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            model,
            config,
            output,
            generate_config,
        } => {
            if generate_config {
                encode::generate_config_template(&model)?;
            } else {
                encode::run(&model, config.as_deref(), output.as_deref())?;
            }
        }
        Commands::Inspect { model, micro_rows } => {
            inspect::run(&model, micro_rows)?;
        }
    }

    Ok(())
}
