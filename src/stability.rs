//! Quiescence probe: shell out to the modification-check script.
//!
//! The script samples a directory's contents twice, `interval` seconds
//! apart, and prints something only when nothing changed in between. We
//! own none of that logic; non-empty stdout means stable.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Run the probe against one directory. `Ok(true)` when the directory has
/// stopped changing; a nonzero script exit is an error.
pub fn is_quiescent(script: &Path, dir: &Path, interval: Duration) -> Result<bool> {
    let output = Command::new(script)
        .arg(dir)
        .arg(interval.as_secs().to_string())
        .output()
        .with_context(|| format!("could not run {}", script.display()))?;
    if !output.status.success() {
        anyhow::bail!("{} exited with {}", script.display(), output.status);
    }
    Ok(!output.stdout.is_empty())
}
