//! Resolve runner settings from CLI flags plus an optional TOML config file.
//! Flags win over file values; required paths are validated here.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CHECK_SCRIPT: &str = "./check_file_modification.sh";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
const DEFAULT_SPOOL_COMMAND: &str = "tsp";

/// Common flags shared by the scan and watch subcommands. Any of these may
/// instead come from the config file; a flag given on the command line wins.
#[derive(Debug, Default, clap::Args)]
pub struct Opts {
    /// Syncthing completion URL (e.g. http://localhost:8384/rest/db/completion?folder=runs)
    #[arg(long)]
    pub url: Option<String>,
    /// Syncthing API key (required together with --url)
    #[arg(long)]
    pub api_key: Option<String>,
    /// Pipeline script handed to the spooler for each new directory
    #[arg(long)]
    pub script_path: Option<PathBuf>,
    /// Base directory where synced input directories appear
    #[arg(long)]
    pub input_dir_base: Option<PathBuf>,
    /// Base directory where pipeline results are written
    #[arg(long)]
    pub result_dir_base: Option<PathBuf>,
    /// Quiescence probe script, run as `<script> <dir> <interval>`
    #[arg(long)]
    pub check_script: Option<PathBuf>,
    /// Seconds between the probe's two samples
    #[arg(long)]
    pub check_interval: Option<u64>,
    /// Task spooler binary (some systems install it as `ts`)
    #[arg(long)]
    pub spool_command: Option<PathBuf>,
    /// TOML config file providing defaults for the flags above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Config file counterpart of [`Opts`]. All keys optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub script_path: Option<PathBuf>,
    pub input_dir_base: Option<PathBuf>,
    pub result_dir_base: Option<PathBuf>,
    pub check_script: Option<PathBuf>,
    pub check_interval: Option<u64>,
    pub spool_command: Option<PathBuf>,
}

/// Sync-gate credentials: both or neither of --url/--api-key.
#[derive(Debug)]
pub struct SyncCheck {
    pub url: String,
    pub api_key: String,
}

/// Fully resolved settings for one scan or watch run.
#[derive(Debug)]
pub struct Settings {
    pub sync: Option<SyncCheck>,
    pub script_path: PathBuf,
    pub input_dir_base: PathBuf,
    pub result_dir_base: PathBuf,
    pub check_script: PathBuf,
    pub check_interval: Duration,
    pub spool_command: PathBuf,
}

impl Settings {
    /// Merge flags over the config file (explicit --config, else
    /// <config_dir>/pipespool/config.toml when present) and validate.
    pub fn resolve(opts: Opts) -> Result<Self> {
        let file = match opts.config {
            Some(ref path) => load_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_file(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::merge(opts, file)
    }

    fn merge(opts: Opts, file: FileConfig) -> Result<Self> {
        let url = opts.url.or(file.url);
        let api_key = opts.api_key.or(file.api_key);
        let sync = match (url, api_key) {
            (Some(url), Some(api_key)) => Some(SyncCheck { url, api_key }),
            (None, None) => None,
            (Some(_), None) => anyhow::bail!("--url requires --api-key"),
            (None, Some(_)) => anyhow::bail!("--api-key requires --url"),
        };
        let script_path = opts
            .script_path
            .or(file.script_path)
            .ok_or_else(|| anyhow::anyhow!("--script-path is required"))?;
        let input_dir_base = opts
            .input_dir_base
            .or(file.input_dir_base)
            .ok_or_else(|| anyhow::anyhow!("--input-dir-base is required"))?;
        let result_dir_base = opts
            .result_dir_base
            .or(file.result_dir_base)
            .ok_or_else(|| anyhow::anyhow!("--result-dir-base is required"))?;
        Ok(Settings {
            sync,
            script_path,
            input_dir_base,
            result_dir_base,
            check_script: opts
                .check_script
                .or(file.check_script)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECK_SCRIPT)),
            check_interval: Duration::from_secs(
                opts.check_interval
                    .or(file.check_interval)
                    .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS),
            ),
            spool_command: opts
                .spool_command
                .or(file.spool_command)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_COMMAND)),
        })
    }
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Result<FileConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let config: FileConfig =
        toml::from_str(&s).map_err(|e| anyhow::anyhow!("invalid {}: {}", path.display(), e))?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pipespool").join("config.toml"))
}
