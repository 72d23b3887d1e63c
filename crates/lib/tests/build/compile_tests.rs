use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use netpack_lib::compile::{CompileError, Compiler};
use netpack_lib::config::Config;
use netpack_lib::context::BuildContext;
use netpack_lib::execute::ExecuteError;
use netpack_lib::install::InstallError;
use netpack_lib::layout::{LayoutError, LayoutKind};
use netpack_lib::manifest::Manifest;
use netpack_lib::report::MemoryReporter;

use super::common::*;

fn context(bp: &Buildpack, build_dir: &std::path::Path) -> BuildContext {
  BuildContext::new(build_dir, bp.cache_dir(), Manifest::load(&bp.manifest_path).unwrap())
}

#[test]
fn source_app_installs_sdk_node_and_restores() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_source_app(&build_dir);
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let report = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap();

  assert_eq!(report.layout.kind, LayoutKind::SourceMulti);
  let installed: Vec<_> = report.installed.iter().map(|i| i.name.as_str()).collect();
  assert_eq!(installed, vec!["libunwind", "dotnet-sdk", "node"]);
  assert_eq!(report.restored, vec!["dotnet-sdk"]);
  assert_eq!(calls.get(), 3);

  assert!(build_dir.join(".libunwind/lib/libunwind.so.8").is_file());
  assert!(build_dir.join(".dotnet/sdk/8.0.204/dotnet.dll").is_file());
  assert!(build_dir.join(".node/bin/node").is_file());
  assert!(build_dir.join(".profile.d/netpack.sh").is_file());
  assert_eq!(
    *shell.commands.borrow(),
    vec!["dotnet restore \"src/Shop.Web/Shop.Web.csproj\"".to_string()]
  );
  assert_eq!(
    reporter.steps(),
    vec![
      "Detected multi-project source application",
      "Installing libunwind 1.6.2",
      "Installing dotnet-sdk 8.0.204",
      "Restoring src/Shop.Web/Shop.Web.csproj",
      "Installing node 20.11.0",
    ]
  );
}

#[test]
fn portable_web_app_installs_both_frameworks() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_file(
    &build_dir,
    "Shop.runtimeconfig.json",
    r#"{"runtimeOptions":{"framework":{"name":"Microsoft.AspNetCore.App","version":"8.0.0"}}}"#,
  );
  write_file(&build_dir, "Shop.dll", "");
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let report = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap();

  let installed: Vec<_> = report
    .installed
    .iter()
    .map(|i| format!("{} {}", i.name, i.version))
    .collect();
  assert_eq!(
    installed,
    vec!["libunwind 1.6.2", "dotnet-runtime 8.0.4", "dotnet-aspnetcore 8.0.4"]
  );
  assert!(report.restored.is_empty());
  assert!(shell.commands.borrow().is_empty());
  assert!(build_dir.join(".dotnet/shared/Microsoft.NETCore.App/8.0.4/System.dll").is_file());
  assert!(build_dir.join(".dotnet/shared/Microsoft.AspNetCore.App/8.0.4/Microsoft.AspNetCore.dll").is_file());
}

#[test]
fn self_contained_app_only_gets_native_libraries() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_file(&build_dir, "Shop.runtimeconfig.json", r#"{"runtimeOptions":{}}"#);
  write_file(&build_dir, "Shop", "");
  write_file(&build_dir, "libhostfxr.so", "");
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let report = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap();

  let installed: Vec<_> = report.installed.iter().map(|i| i.name.as_str()).collect();
  assert_eq!(installed, vec!["libunwind"]);
  assert!(!build_dir.join(".dotnet").exists());
}

#[test]
fn warm_cache_rebuild_is_identical_and_offline() {
  let bp = Buildpack::new();
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let cold = bp.build_dir("cold");
  write_source_app(&cold);
  assert!(Compiler::new(context(&bp, &cold), bp.counting_cache(&calls), &shell, &reporter).compile());
  let downloads = calls.get();

  let warm = bp.build_dir("warm");
  write_source_app(&warm);
  assert!(Compiler::new(context(&bp, &warm), bp.counting_cache(&calls), &shell, &reporter).compile());

  assert_eq!(calls.get(), downloads);
  assert_eq!(snapshot(&cold), snapshot(&warm));
}

#[test]
fn repeat_compile_of_same_build_dir_is_a_no_op() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_source_app(&build_dir);
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();

  let first = MemoryReporter::new();
  Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &first)
    .run()
    .unwrap();
  let before = snapshot(&build_dir);

  let second = MemoryReporter::new();
  Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &second)
    .run()
    .unwrap();

  assert_eq!(snapshot(&build_dir), before);
  assert!(!second.steps().iter().any(|s| s.starts_with("Installing")));
}

#[test]
fn restore_failure_reports_command_output() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_source_app(&build_dir);
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell {
    fail_on: Some("restore"),
    ..Default::default()
  };
  let reporter = MemoryReporter::new();

  let err = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap_err();

  match &err {
    CompileError::Restore {
      installer,
      source: InstallError::Execute(ExecuteError::CmdFailed { cmd, stderr, .. }),
    } => {
      assert_eq!(installer, "dotnet-sdk");
      assert!(cmd.starts_with("dotnet restore"));
      assert!(stderr.contains("NU1301"));
    }
    other => panic!("expected restore failure, got {other:?}"),
  }
  assert!(err.to_string().contains("dotnet-sdk failed to restore"));
  assert!(!build_dir.join(".node").exists());
}

#[test]
fn checksum_mismatch_aborts_before_later_installers() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_source_app(&build_dir);
  let mut manifest = Manifest::load(&bp.manifest_path).unwrap();
  for dep in manifest.dependencies.iter_mut().filter(|d| d.name == "dotnet-sdk") {
    dep.sha256 = "0".repeat(64);
  }
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let err = Compiler::new(
    BuildContext::new(&build_dir, bp.cache_dir(), manifest),
    bp.counting_cache(&calls),
    &shell,
    &reporter,
  )
  .run()
  .unwrap_err();

  assert!(matches!(
    err,
    CompileError::Install {
      source: InstallError::Cache(_),
      ..
    }
  ));
  assert!(shell.commands.borrow().is_empty());
  assert!(!build_dir.join(".node").exists());
}

#[test]
fn ambiguous_layout_fails_before_any_work() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_file(&build_dir, "a/A.csproj", LIB_CSPROJ);
  write_file(&build_dir, "b/B.csproj", LIB_CSPROJ);
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let err = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap_err();

  assert!(matches!(err, CompileError::Layout(LayoutError::Ambiguous { .. })));
  assert_eq!(calls.get(), 0);
  assert!(!bp.cache_dir().exists());
}

#[test]
fn skipped_installers_and_extra_resources_come_from_config() {
  let bp = Buildpack::new();
  let build_dir = bp.build_dir("app");
  write_source_app(&build_dir);
  write_file(bp.temp.path(), "resources/.profile.d/proxy.sh", "export HTTP_PROXY=");
  let mut config = Config::with_manifest(&bp.manifest_path);
  config.skip_installers.insert("node".to_string());
  config.resources_dir = Some(bp.temp.path().join("resources"));
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let report = Compiler::new(context(&bp, &build_dir), bp.counting_cache(&calls), &shell, &reporter)
    .with_config(&config)
    .run()
    .unwrap();

  assert_eq!(report.skipped, vec!["node"]);
  assert!(!build_dir.join(".node").exists());
  assert!(build_dir.join(".profile.d/proxy.sh").is_file());
  assert_eq!(
    fs::read_to_string(build_dir.join(".profile.d/proxy.sh")).unwrap(),
    "export HTTP_PROXY="
  );
}

/// The manifest with a newer node release, made the default.
fn manifest_with_newer_node(bp: &Buildpack) -> Manifest {
  let sha = bp.add_archive("node", "20.12.0", &[("node-v20.12.0-linux-x64/bin/node", "node 20.12")]);
  let mut manifest = Manifest::load(&bp.manifest_path).unwrap();
  let mut newer = manifest.find("node", "20.11.0").unwrap().clone();
  newer.version = "20.12.0".to_string();
  newer.sha256 = sha;
  manifest.dependencies.push(newer);
  manifest
    .default_versions
    .iter_mut()
    .filter(|d| d.name == "node")
    .for_each(|d| d.version = "20.x".to_string());
  manifest
}

#[test]
fn changing_version_prunes_the_old_cache_entry() {
  let bp = Buildpack::new();
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let first = bp.build_dir("first");
  write_source_app(&first);
  Compiler::new(context(&bp, &first), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap();

  let mut config = Config::with_manifest(&bp.manifest_path);
  config.prune_grace = Duration::ZERO;
  let second = bp.build_dir("second");
  write_source_app(&second);
  let report = Compiler::new(
    BuildContext::new(&second, bp.cache_dir(), manifest_with_newer_node(&bp)),
    bp.counting_cache(&calls),
    &shell,
    &reporter,
  )
  .with_config(&config)
  .run()
  .unwrap();

  assert_eq!(fs::read_to_string(second.join(".node/bin/node")).unwrap(), "node 20.12");
  assert_eq!(report.pruned.len(), 1);
  assert!(report.pruned[0].file_name().unwrap().to_string_lossy().starts_with("node-20.11.0-"));
}

#[test]
fn recently_used_versions_survive_pruning() {
  let bp = Buildpack::new();
  let calls = Rc::new(Cell::new(0));
  let shell = FakeShell::default();
  let reporter = MemoryReporter::new();

  let first = bp.build_dir("first");
  write_source_app(&first);
  Compiler::new(context(&bp, &first), bp.counting_cache(&calls), &shell, &reporter)
    .run()
    .unwrap();

  let second = bp.build_dir("second");
  write_source_app(&second);
  let report = Compiler::new(
    BuildContext::new(&second, bp.cache_dir(), manifest_with_newer_node(&bp)),
    bp.counting_cache(&calls),
    &shell,
    &reporter,
  )
  .run()
  .unwrap();

  assert!(report.pruned.is_empty());
  let node_entries = fs::read_dir(bp.cache_dir().join("deps"))
    .unwrap()
    .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with("node-"))
    .count();
  assert_eq!(node_entries, 2);
}
