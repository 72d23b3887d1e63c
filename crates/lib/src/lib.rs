//! netpack-lib: building .NET applications for a buildpack platform.
//!
//! - [`layout`] classifies a build directory (source or published output)
//! - [`cache`] keeps verified, extracted dependencies between builds
//! - [`install`] holds the ordered installers that populate the build directory
//! - [`compile`] drives a build; [`release`] describes how to launch it

pub mod cache;
pub mod compile;
pub mod config;
pub mod consts;
pub mod context;
pub mod env;
pub mod execute;
pub mod install;
pub mod layout;
pub mod manifest;
pub mod release;
pub mod report;
pub mod util;
