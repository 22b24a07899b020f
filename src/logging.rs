//! Tracing setup. The interactive client logs to a file because stderr
//! would tear the alternate screen; the relay logs to stderr like any
//! other service.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chinwag=info"))
}

pub fn init_file(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .init();
    Ok(())
}

pub fn init_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Default client log location, next to the session registry.
pub fn default_log_path() -> PathBuf {
    let proj_dirs =
        ProjectDirs::from("io", "chinwag", "chinwag").expect("Failed to determine data directory");
    proj_dirs.data_dir().join("chinwag.log")
}
