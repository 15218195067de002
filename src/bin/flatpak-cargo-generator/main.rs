use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flatpak_cargo::{Generator, GitCache, LockFile};

use crate::error::AppError;

mod args;
mod error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            err.report();
            err.into()
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<(), AppError> {
    let args = args::parse()?;
    init_logging(args.debug);

    let document = std::fs::read_to_string(&args.cargo_lock)
        .map_err(|err| AppError::lockfile_read(args.cargo_lock.clone(), err))?;
    let lock = LockFile::from_toml(&document)
        .map_err(|err| AppError::lockfile_parse(args.cargo_lock.clone(), err))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(flatpak_cargo::Error::from)?;
    let generator =
        Generator::new(GitCache::new(&args.cache_dir)).git_tarballs(args.git_tarballs);
    let sources = runtime.block_on(generator.generate(&lock))?;

    write_output(&args.output, &flatpak_cargo::to_json(&sources)?)?;
    info!("Wrote {} sources to {}", sources.len(), args.output.display());
    Ok(())
}

/// Write the output through a temporary file so an existing file is replaced whole or not at all.
fn write_output(path: &Path, contents: &str) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let write = || -> std::io::Result<()> {
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(contents.as_bytes())?;
        file.persist(path)?;
        Ok(())
    };
    write().map_err(|err| AppError::output_write(path.to_path_buf(), err))
}
