//! Names and fixed paths shared across the crate.

use std::time::Duration;

/// Marker written inside a cache entry once extraction has finished.
pub const CACHE_COMPLETE_MARKER: &str = ".netpack-complete";

/// How long a cache entry stays safe from pruning after its last use.
pub const DEFAULT_PRUNE_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

/// Length of the checksum prefix used in cache key directory names.
pub const CACHE_KEY_SHA_LEN: usize = 16;

/// Build-directory state owned by the buildpack (install receipts).
pub const STATE_DIR: &str = ".netpack";

/// Where installed .NET bits land inside the build directory.
pub const DOTNET_DIR: &str = ".dotnet";

/// Where the launch environment script is written.
pub const PROFILE_D_DIR: &str = ".profile.d";

/// Default manifest file name in the buildpack root.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// NuGet package cache populated by restore, inside the build directory.
pub const NUGET_DIR: &str = ".nuget/packages";

/// Printed by `detect`; matches the manifest's `language`.
pub const LANGUAGE: &str = "dotnet-core";
