use std::fs;

use predicates::prelude::*;

use super::common::*;

#[test]
fn compile_installs_and_restores_source_app() {
  let env = TestEnv::new();
  env.write_app_file("src/Web/Web.csproj", WEB_CSPROJ);

  env
    .compile_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("-----> Installing libunwind 1.6.2"))
    .stdout(predicate::str::contains("-----> Installing dotnet-sdk 8.0.204"))
    .stdout(predicate::str::contains("-----> Restoring src/Web/Web.csproj"));

  let build = env.build_path();
  assert!(build.join(".libunwind/lib/libunwind.so.8").is_file());
  assert!(build.join(".profile.d/netpack.sh").is_file());

  let log = fs::read_to_string(build.join(".dotnet/invocation.log")).unwrap();
  let lines: Vec<_> = log.lines().collect();
  assert_eq!(lines[0], "restore src/Web/Web.csproj");
  assert_eq!(lines[1], build.join(".nuget/packages").display().to_string());
}

#[test]
fn supply_env_file_reaches_restore() {
  let env = TestEnv::new();
  env.write_app_file("App.csproj", WEB_CSPROJ);
  let env_file = env.temp.path().join("supply.env");
  fs::write(&env_file, "# from platform\nexport SUPPLIED=yes\n").unwrap();

  env.compile_cmd().arg("--env-file").arg(&env_file).assert().success();

  let log = fs::read_to_string(env.build_path().join(".dotnet/invocation.log")).unwrap();
  assert_eq!(log.lines().nth(2), Some("yes"));
}

#[test]
fn second_compile_uses_receipts() {
  let env = TestEnv::new();
  env.write_app_file("App.csproj", WEB_CSPROJ);

  env.compile_cmd().assert().success();
  env
    .compile_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Installing").not())
    .stdout(predicate::str::contains("Using installed dotnet-sdk 8.0.204"));
}

#[test]
fn skipped_installer_is_not_installed() {
  let env = TestEnv::new();
  env.write_app_file("App.csproj", WEB_CSPROJ);

  env
    .compile_cmd()
    .env("NETPACK_SKIP_INSTALLERS", "libunwind")
    .assert()
    .success()
    .stdout(predicate::str::contains("Skipped"));

  assert!(!env.build_path().join(".libunwind").exists());
}

#[test]
fn json_report() {
  let env = TestEnv::new();
  env.write_app_file("App.csproj", WEB_CSPROJ);

  let output = env.compile_cmd().arg("--json").output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["layout"]["kind"], "source-single");
  assert_eq!(report["installed"].as_array().unwrap().len(), 2);
}

#[test]
fn ambiguous_app_is_detected_but_fails_compile_with_candidates() {
  let env = TestEnv::new();
  env.write_app_file("a/A.csproj", WEB_CSPROJ);
  env.write_app_file("b/B.csproj", WEB_CSPROJ);

  env.netpack_cmd().arg("detect").arg(env.build_path()).assert().success();
  env
    .compile_cmd()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("cannot determine which project to run"))
    .stderr(predicate::str::contains("a/A.csproj"))
    .stderr(predicate::str::contains("b/B.csproj"));

  assert!(!env.build_path().join(".libunwind").exists());
}

#[test]
fn missing_dependency_is_a_configuration_error() {
  let env = TestEnv::new();
  env.write_app_file(
    "App.runtimeconfig.json",
    r#"{"runtimeOptions":{"framework":{"name":"Microsoft.NETCore.App","version":"8.0.0"}}}"#,
  );

  env
    .compile_cmd()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("configuration error for dotnet-runtime"));

  assert!(!env.build_path().join(".libunwind").exists());
}

#[test]
fn release_after_compile() {
  let env = TestEnv::new();
  env.write_app_file("App.csproj", WEB_CSPROJ);
  env.compile_cmd().assert().success();

  env
    .netpack_cmd()
    .arg("release")
    .arg(env.build_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("dotnet run --no-restore"));
}
