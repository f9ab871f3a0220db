use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Path to the content directory (config.json, stories/, templates/, static/).
    #[arg(long, default_value = "./content", global = true)]
    pub content: PathBuf,
    /// Output directory for the generated site.
    #[arg(long, default_value = "./out", global = true)]
    pub out: PathBuf,
    /// Production build: draft stories are left out.
    #[arg(long, global = true)]
    pub prod: bool,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "build", about = "Generate the site once. [default]")]
    Build,
    #[command(
        name = "watch",
        about = "Generate the site, then regenerate it whenever stories or templates change."
    )]
    Watch(WatchArgs),
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// How often to poll the content directory, in milliseconds.
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(argv: &[&str]) -> Result<u64, clap::Error> {
        match Args::try_parse_from(argv)?.command {
            Some(Commands::Watch(watch)) => Ok(watch.interval_ms),
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn interval_defaults_to_half_a_second() {
        assert_eq!(interval(&["publisher", "watch"]).unwrap(), 500);
        assert_eq!(
            interval(&["publisher", "watch", "--interval-ms", "20"]).unwrap(),
            20
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(interval(&["publisher", "watch", "--interval-ms", "0"]).is_err());
    }

    #[test]
    fn build_is_the_default() {
        let args = Args::try_parse_from(["publisher", "--prod"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.prod);
    }
}
