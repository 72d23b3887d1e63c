//! Implementation of the `netpack compile` command.
//!
//! Loads the manifest and supply environment, then runs every applicable
//! installer against the build directory:
//! - resolves the application layout
//! - installs native libraries, the SDK or shared frameworks, and node
//! - restores source projects
//! - writes the launch environment script

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use netpack_lib::cache::DependencyCache;
use netpack_lib::compile::Compiler;
use netpack_lib::config::Config;
use netpack_lib::context::BuildContext;
use netpack_lib::env::parse_env_file;
use netpack_lib::execute::SystemShell;
use netpack_lib::manifest::Manifest;
use netpack_lib::report::{NullReporter, Reporter};

use crate::output::{ConsoleReporter, format_duration, print_json, print_stat, print_success};

pub fn cmd_compile(
  build_dir: &Path,
  cache_dir: &Path,
  env_file: Option<&Path>,
  config: &Config,
  json: bool,
) -> Result<bool> {
  let start = Instant::now();

  let manifest = Manifest::load(&config.manifest_path)
    .with_context(|| format!("Failed to load manifest {}", config.manifest_path.display()))?;
  let mut context = BuildContext::new(build_dir, cache_dir, manifest);
  if let Some(path) = env_file {
    let supplied = parse_env_file(path).context("Failed to read supply environment")?;
    context = context.with_env(supplied);
  }

  let cache = DependencyCache::with_http(cache_dir);
  let shell = SystemShell;
  // Progress lines would corrupt the JSON document on stdout.
  let reporter: &dyn Reporter = if json { &NullReporter } else { &ConsoleReporter };

  let report = Compiler::new(context, cache, &shell, reporter)
    .with_config(config)
    .run()
    .context("Compile failed")?;

  if json {
    print_json(&report)?;
    return Ok(true);
  }

  print_success(&format!("Compiled in {}", format_duration(start.elapsed())));
  print_stat("Installed", &report.installed.len().to_string());
  if !report.skipped.is_empty() {
    print_stat("Skipped", &report.skipped.join(", "));
  }
  if !report.pruned.is_empty() {
    print_stat("Pruned", &report.pruned.len().to_string());
  }

  Ok(true)
}
