//! One-shot scan: gate on sync completion, diff the input listing against
//! finished and queued work, probe each candidate for quiescence, then
//! spool a pipeline run per stable candidate. Used by the watch loop and
//! for cron/scripts.

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Settings;
use crate::spool::Spooler;
use crate::stability;
use crate::syncthing;

/// Run one full scan. When the sync gate is configured and the folder has
/// not finished syncing, nothing is scanned. Candidates whose probe fails
/// or reports changes are skipped; a failed submission aborts the scan.
pub fn run(settings: &Settings, dry_run: bool) -> Result<()> {
    if let Some(ref sync) = settings.sync {
        if !syncthing::check_completion(&sync.url, &sync.api_key)? {
            info!("sync not complete; nothing to do");
            return Ok(());
        }
    }

    if !settings.input_dir_base.exists() {
        warn!(
            path = %settings.input_dir_base.display(),
            "input base does not exist; nothing to scan"
        );
        return Ok(());
    }

    let spooler = Spooler::new(&settings.spool_command);
    let input = list_dir_names(&settings.input_dir_base);
    let done = list_dir_names(&settings.result_dir_base);
    let queued = spooler.queued_labels()?;

    let mut new_dirs: Vec<String> = candidates(&input, &done, &queued).into_iter().collect();
    new_dirs.sort();

    for name in &new_dirs {
        let input_dir = settings.input_dir_base.join(name);
        let output_dir = settings.result_dir_base.join(name);
        match stability::is_quiescent(&settings.check_script, &input_dir, settings.check_interval) {
            Ok(true) => {}
            Ok(false) => {
                info!(dir = %name, "still changing; skipping");
                continue;
            }
            Err(e) => {
                warn!(dir = %name, "quiescence probe failed: {}", e);
                continue;
            }
        }
        if dry_run {
            info!(
                dir = %name,
                input = %input_dir.display(),
                output = %output_dir.display(),
                "would submit run"
            );
            continue;
        }
        spooler.submit(name, &settings.script_path, &input_dir, &output_dir)?;
        info!(dir = %name, "submitted run");
    }

    Ok(())
}

/// Pure diff: input names minus finished names minus queued labels.
pub fn candidates(
    input: &HashSet<String>,
    done: &HashSet<String>,
    queued: &HashSet<String>,
) -> HashSet<String> {
    input
        .iter()
        .filter(|name| !done.contains(*name) && !queued.contains(*name))
        .cloned()
        .collect()
}

/// Immediate subdirectory names of a base directory. Plain files are not
/// work units; a missing base lists as empty.
pub fn list_dir_names(base: &Path) -> HashSet<String> {
    let mut out = HashSet::new();
    if !base.exists() {
        return out;
    }
    for entry in walkdir::WalkDir::new(base)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                out.insert(name.to_string());
            }
        }
    }
    out
}
