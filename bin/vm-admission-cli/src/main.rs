// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use slog::{debug, info, o, Drain, Level, Logger};
use vm_admission::{AdmissionRequest, Reviewer};
use vm_spec_types::{VirtualMachine, VirtualMachineSpec};

#[derive(Debug, Parser)]
#[clap(about, version)]
/// Check VirtualMachine specs against the admission rules
struct Opt {
    /// Enable debugging
    #[clap(short, long, action)]
    debug: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a spec that is about to be created
    Create {
        /// Spec file (.json or .toml)
        #[clap(action)]
        spec: PathBuf,
    },

    /// Check a change from one spec to another
    Update {
        /// The spec as currently stored
        #[clap(action)]
        old: PathBuf,

        /// The proposed replacement
        #[clap(action)]
        new: PathBuf,
    },

    /// Check a spec that is about to be deleted
    Delete {
        #[clap(action)]
        spec: PathBuf,
    },

    /// Answer an admission request read from a JSON file, printing the
    /// response on stdout
    Review {
        #[clap(action)]
        request: PathBuf,
    },

    /// Print the JSON schema for VirtualMachine objects
    Schema,
}

/// Logs to stderr so that stdout carries only command output.
fn create_logger(debug: bool) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level = if debug { Level::Debug } else { Level::Info };
    let drain = slog::LevelFilter(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

fn read_request(path: &Path) -> anyhow::Result<AdmissionRequest> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn load_spec(log: &Logger, path: &Path) -> anyhow::Result<VirtualMachineSpec> {
    debug!(log, "loading spec"; "path" => %path.display());
    vm_spec_types::parse(path)
        .with_context(|| anyhow!("failed to load spec from {}", path.display()))
}

fn report(
    log: &Logger,
    what: &str,
    result: Result<vm_admission::Warnings, vm_admission::AdmissionError>,
) -> anyhow::Result<()> {
    let warnings = result.with_context(|| anyhow!("{} rejected", what))?;
    for warning in &warnings {
        slog::warn!(log, "{}", warning);
    }
    info!(log, "{} admitted", what);
    Ok(())
}

fn review(log: &Logger, path: &Path) -> anyhow::Result<()> {
    let request = read_request(path).with_context(|| {
        format!("failed to read admission request from {}", path.display())
    })?;

    let response = Reviewer::new(log.clone()).review(&request);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.allowed {
        anyhow::bail!("request {} denied", response.uid);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    let log = create_logger(opt.debug);

    match opt.cmd {
        Command::Create { spec } => {
            let spec = load_spec(&log, &spec)?;
            report(&log, "create", vm_admission::validate_create(&spec))?;
        }
        Command::Update { old, new } => {
            let old = load_spec(&log, &old)?;
            let new = load_spec(&log, &new)?;
            report(&log, "update", vm_admission::validate_update(&old, &new))?;
        }
        Command::Delete { spec } => {
            let spec = load_spec(&log, &spec)?;
            report(&log, "delete", vm_admission::validate_delete(&spec))?;
        }
        Command::Review { request } => review(&log, &request)?,
        Command::Schema => {
            let schema = schemars::schema_for!(VirtualMachine);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}
