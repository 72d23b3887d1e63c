mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use netpack_lib::config::Config;

use crate::cmd::{cmd_compile, cmd_detect, cmd_release};
use crate::output::print_error;

/// netpack - build .NET applications for a buildpack platform
#[derive(Parser)]
#[command(name = "netpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Exit successfully if the build directory holds a .NET application
  Detect {
    /// Application directory
    build_dir: PathBuf,
  },

  /// Install the runtime and dependencies into the build directory
  Compile {
    /// Application directory, modified in place
    build_dir: PathBuf,

    /// Directory kept between builds for downloaded dependencies
    cache_dir: PathBuf,

    /// File of VAR=value lines added to the build environment
    #[arg(long, env = "NETPACK_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Print the compile report as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the launch descriptor as YAML
  Release {
    /// Application directory
    build_dir: PathBuf,
  },
}

fn init_tracing(verbose: bool, config: &Config) {
  let default = if verbose {
    "netpack_lib=debug,netpack_cli=debug".to_string()
  } else {
    config.log_filter.clone().unwrap_or_else(|| "warn".to_string())
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  let config = Config::from_env();
  init_tracing(cli.verbose, &config);

  let result = match cli.command {
    Commands::Detect { build_dir } => cmd_detect(&build_dir),
    Commands::Compile {
      build_dir,
      cache_dir,
      env_file,
      json,
    } => cmd_compile(&build_dir, &cache_dir, env_file.as_deref(), &config, json),
    Commands::Release { build_dir } => cmd_release(&build_dir),
  };

  match result {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
