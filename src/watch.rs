//! Watch the input base; on any change, run a scan (submit runs for new
//! stable directories). The scan itself re-diffs against results and the
//! spool queue, so a redundant wakeup is harmless.

use anyhow::Result;
use std::sync::mpsc;
use std::time::Duration;
use tracing::error;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::Settings;
use crate::scan;

/// Run the watcher. If `once` is true, run one full scan then exit (for
/// service startup).
pub fn run(settings: &Settings, once: bool) -> Result<()> {
    if once {
        return scan::run(settings, false);
    }
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            let _ = tx.send(res);
        },
        Config::default(),
    )?;

    watcher.watch(&settings.input_dir_base, RecursiveMode::NonRecursive)?;

    // Debounce: on any event, wait 500ms for more events then scan
    loop {
        let _ = rx.recv()?;
        while rx.recv_timeout(Duration::from_millis(500)).is_ok() {}
        if let Err(e) = scan::run(settings, false) {
            error!("scan failed: {}", e);
        }
    }
}
