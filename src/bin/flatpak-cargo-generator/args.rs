use std::path::PathBuf;

use clap::Parser;

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

const HEADER: Style = Green.on_default().effects(Effects::BOLD);
const USAGE: Style = Green.on_default().effects(Effects::BOLD);
const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = Cyan.on_default();
const ERROR: Style = Red.on_default().effects(Effects::BOLD);
const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

const DEFAULT_OUTPUT: &str = "generated-sources.json";
const CACHE_ENV: &str = "FLATPAK_CARGO_CACHE";

#[derive(Debug, Parser)]
#[command(name = "flatpak-cargo-generator")]
#[command(about = "Generate flatpak-builder sources from a Cargo.lock file")]
#[command(version, long_about = None)]
#[command(styles = APP_STYLING)]
#[command(term_width = 80)]
struct Args {
    /// Path to the Cargo.lock file
    #[arg(value_name = "CARGO_LOCK")]
    cargo_lock: PathBuf,

    /// Where to write generated sources
    #[arg(long, short = 'o', value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Download git repos as tarballs
    #[arg(long, short = 't')]
    git_tarballs: bool,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Directory for local clones of git dependencies. If omitted, check the
    /// `FLATPAK_CARGO_CACHE` environment variable and then `~/.cache/flatpak-cargo`
    #[arg(long = "cache-dir", short = 'c', value_name = "PATH")]
    cache_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub cargo_lock: PathBuf,
    pub output: PathBuf,
    pub git_tarballs: bool,
    pub debug: bool,
    pub cache_dir: PathBuf,
}

impl ValidatedArgs {
    /// Detect the cache directory, falling back to `FLATPAK_CARGO_CACHE` then
    /// ~/.cache/flatpak-cargo
    fn detect_cache_dir(arg: Option<PathBuf>) -> Result<PathBuf, AppError> {
        match arg {
            Some(dir) => Ok(dir),
            None => match std::env::var_os(CACHE_ENV) {
                Some(dir) => Ok(PathBuf::from(dir)),
                None => {
                    let project_dirs = directories::ProjectDirs::from("", "", "flatpak-cargo")
                        .ok_or(AppError::arg_validation(
                            "could not determine cache directory".to_string(),
                        ))?;
                    Ok(project_dirs.cache_dir().to_path_buf())
                }
            },
        }
    }
}

impl TryFrom<Args> for ValidatedArgs {
    type Error = AppError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if !args.cargo_lock.is_file() {
            return Err(AppError::arg_validation(format!(
                "lockfile does not exist: {}",
                args.cargo_lock.display()
            )));
        }
        if let Some(parent) = args.output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(AppError::arg_validation(format!(
                "output directory does not exist: {}",
                parent.display()
            )));
        }
        Ok(ValidatedArgs {
            cargo_lock: args.cargo_lock,
            output: args.output,
            git_tarballs: args.git_tarballs,
            debug: args.debug,
            cache_dir: Self::detect_cache_dir(args.cache_dir)?,
        })
    }
}

pub fn parse() -> Result<ValidatedArgs, AppError> {
    ValidatedArgs::try_from(Args::parse())
}
