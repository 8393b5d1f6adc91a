// Command-line surface: clap arguments and their translation into the
// `RunConfig` the batch runner consumes.

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::batch::Mode;
use crate::config::{MaxRatio, RetryPolicy, RunConfig, DEFAULT_MAX_RATIO};
use crate::output::OutputNaming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Naming {
    /// Use the file name the server assigns to the download
    Server,
    /// Name the output <stem>_compressed.<ext>
    Suffixed,
}

#[derive(Parser, Debug)]
#[command(name = "tinyshrink")]
#[command(about = "Compress PNG, JPEG and WebP images through the TinyPNG web endpoint")]
pub struct Cli {
    /// PNG or JPG file, directory of images, or a .txt file of paths
    #[arg(short, long)]
    pub path: PathBuf,

    /// Keep re-compressing the output until no further gain or --max is reached
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Folder to store compressed pictures (default: next to the source)
    #[arg(short, long, conflicts_with = "overwrite")]
    pub output: Option<PathBuf>,

    /// Stop recursive compression once this overall shrink (percent) is reached
    #[arg(short, long, default_value_t = DEFAULT_MAX_RATIO, allow_negative_numbers = true)]
    pub max: f64,

    /// Replace the source file with the compressed result
    #[arg(short = 'w', long, default_value_t = false)]
    pub overwrite: bool,

    /// How to name the output file
    #[arg(long, value_enum, default_value_t = Naming::Server)]
    pub naming: Naming,

    /// Attempts per upload when the server rejects it
    #[arg(long, default_value_t = 10)]
    pub retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub retry_delay_ms: u64,

    /// Multiplier applied to the delay after each retry
    #[arg(long, default_value_t = 1.0)]
    pub backoff: f64,

    /// Only print errors
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

impl Cli {
    pub fn max_ratio(&self) -> MaxRatio {
        MaxRatio::new(self.max)
    }

    pub fn run_config(&self) -> RunConfig {
        let mode = if self.recursive {
            Mode::Recursive(self.max_ratio())
        } else {
            Mode::Single
        };
        let naming = match (self.overwrite, self.naming) {
            (true, _) => OutputNaming::Overwrite,
            (false, Naming::Server) => OutputNaming::ServerAssigned,
            (false, Naming::Suffixed) => OutputNaming::Suffixed,
        };

        RunConfig {
            mode,
            naming,
            output_dir: self.output.clone(),
            retry: RetryPolicy::new(
                self.retries,
                Duration::from_millis(self.retry_delay_ms),
                self.backoff,
            ),
        }
    }
}
