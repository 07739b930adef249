//! Sample application built on `appkit`.
//!
//! ```text
//! sampleapp [-v|-q]... [-c FILE]... [--magic] <command>
//!
//!   dir-op -d DIR                 echo a directory
//!   config ops get KEY            print a setting
//!   config ops set KEY VALUE      change a setting
//!   config reset --yes            forget every setting
//! ```
//!
//! `dir-op` and `config` come from the `dirop` and `config` plugins, which
//! the application loads on start.

pub mod commands;

use appkit::{Application, Result};

pub const NAME: &str = "sampleapp";

/// Builds the application with both plugins loaded.
pub fn app() -> Result<Application> {
    Application::builder(NAME)
        .root_command::<commands::SampleRoot>()
        .plugin("dirop", commands::dirop::install)
        .plugin("config", commands::config::install)
        .load_plugin("dirop")
        .load_plugin("config")
        .build()
}
