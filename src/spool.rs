//! Task spooler (tsp) integration: submit labeled pipeline runs and list
//! the labels of jobs already queued or running.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
    #[error("{program} listing was not UTF-8")]
    BadListing { program: String },
    #[error("directory name {0:?} is not usable as a spool label")]
    BadLabel(String),
}

/// Handle on the spooler binary (tsp, or ts on some distributions).
#[derive(Debug)]
pub struct Spooler {
    program: PathBuf,
}

impl Spooler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Labels of queued or running jobs, from the spooler's list output.
    pub fn queued_labels(&self) -> Result<HashSet<String>, SpoolError> {
        let output = Command::new(&self.program)
            .arg("-l")
            .output()
            .map_err(|source| SpoolError::Spawn {
                program: self.program_name(),
                source,
            })?;
        if !output.status.success() {
            return Err(SpoolError::Failed {
                program: self.program_name(),
                status: output.status,
            });
        }
        let listing = String::from_utf8(output.stdout).map_err(|_| SpoolError::BadListing {
            program: self.program_name(),
        })?;
        Ok(parse_labels(&listing))
    }

    /// Submit one pipeline run:
    /// `tsp -L <label> <script> --input_dir <in> --output_dir <out>`.
    /// The spooler queues it and returns immediately.
    pub fn submit(
        &self,
        label: &str,
        script: &Path,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<(), SpoolError> {
        validate_label(label)?;
        let status = Command::new(&self.program)
            .arg("-L")
            .arg(label)
            .arg(script)
            .arg("--input_dir")
            .arg(input_dir)
            .arg("--output_dir")
            .arg(output_dir)
            .status()
            .map_err(|source| SpoolError::Spawn {
                program: self.program_name(),
                source,
            })?;
        if !status.success() {
            return Err(SpoolError::Failed {
                program: self.program_name(),
                status,
            });
        }
        Ok(())
    }
}

/// Extract `[label]` tags from the job lines of a `tsp -l` listing. The
/// header line is skipped; it carries its own bracketed `[run=N/M]` field.
pub fn parse_labels(listing: &str) -> HashSet<String> {
    let label = Regex::new(r"\[([^\]]+)\]").unwrap();
    listing
        .lines()
        .skip(1)
        .filter_map(|line| label.captures(line))
        .map(|c| c[1].to_string())
        .collect()
}

/// Directory names become `-L` arguments; reject anything the spooler's
/// command line would mangle.
pub fn validate_label(label: &str) -> Result<(), SpoolError> {
    if label.is_empty()
        || label.starts_with('-')
        || label.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(SpoolError::BadLabel(label.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
ID   State      Output               E-Level  Times(r/u/s)   Command [run=1/1]
4    running    /tmp/ts-out.x1Y2z3                           [run_0012]/opt/pipeline/main.sh --input_dir /data/incoming/run_0012 --output_dir /data/results/run_0012
5    queued     (file)                                       [run_0013]/opt/pipeline/main.sh --input_dir /data/incoming/run_0013 --output_dir /data/results/run_0013
2    finished   /tmp/ts-out.a8B9c0   0        610.02/599.84/4.05 [run_0011]/opt/pipeline/main.sh --input_dir /data/incoming/run_0011 --output_dir /data/results/run_0011
";

    #[test]
    fn parse_labels_extracts_one_per_job_line() {
        let labels = parse_labels(LISTING);
        assert_eq!(labels.len(), 3);
        assert!(labels.contains("run_0012"));
        assert!(labels.contains("run_0013"));
        assert!(labels.contains("run_0011"));
    }

    #[test]
    fn parse_labels_skips_header_run_field() {
        let labels = parse_labels(LISTING);
        assert!(!labels.contains("run=1/1"));
    }

    #[test]
    fn parse_labels_empty_queue() {
        let header_only =
            "ID   State      Output               E-Level  Times(r/u/s)   Command [run=0/1]\n";
        assert!(parse_labels(header_only).is_empty());
        assert!(parse_labels("").is_empty());
    }

    #[test]
    fn parse_labels_ignores_unlabeled_jobs() {
        let listing = "\
ID   State      Output               E-Level  Times(r/u/s)   Command [run=0/1]
7    queued     (file)                                       sleep 60
";
        assert!(parse_labels(listing).is_empty());
    }

    #[test]
    fn validate_label_ok() {
        assert!(validate_label("run_0042").is_ok());
        assert!(validate_label("2024-06-01_flowcell.A").is_ok());
    }

    #[test]
    fn validate_label_rejects_unsafe_names() {
        assert!(validate_label("").is_err());
        assert!(validate_label("-L").is_err());
        assert!(validate_label("two words").is_err());
        assert!(validate_label("tab\there").is_err());
        assert!(validate_label("line\nbreak").is_err());
    }

    #[cfg(unix)]
    mod with_stub {
        use crate::spool::{SpoolError, Spooler};
        use std::collections::HashSet;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        /// Write an executable stub standing in for tsp.
        fn write_stub(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("tsp");
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn queued_labels_from_stub_listing() {
            let dir = tempfile::tempdir().unwrap();
            let stub = write_stub(
                dir.path(),
                "#!/bin/sh\n\
                 echo 'ID   State   Output   E-Level  Times(r/u/s)   Command [run=1/1]'\n\
                 echo '0    running /tmp/ts-out.abc                  [run_0001]/opt/p.sh'\n",
            );
            let labels = Spooler::new(&stub).queued_labels().unwrap();
            assert_eq!(labels, HashSet::from(["run_0001".to_string()]));
        }

        #[test]
        fn queued_labels_nonzero_exit_err() {
            let dir = tempfile::tempdir().unwrap();
            let stub = write_stub(dir.path(), "#!/bin/sh\nexit 2\n");
            let err = Spooler::new(&stub).queued_labels().unwrap_err();
            assert!(matches!(err, SpoolError::Failed { .. }));
        }

        #[test]
        fn submit_passes_argv_through() {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let stub = write_stub(
                dir.path(),
                &format!("#!/bin/sh\necho \"$@\" >> {}\n", log.display()),
            );
            Spooler::new(&stub)
                .submit(
                    "run_0001",
                    Path::new("/opt/pipeline/main.sh"),
                    Path::new("/data/incoming/run_0001"),
                    Path::new("/data/results/run_0001"),
                )
                .unwrap();
            let recorded = std::fs::read_to_string(&log).unwrap();
            assert_eq!(
                recorded.trim(),
                "-L run_0001 /opt/pipeline/main.sh --input_dir /data/incoming/run_0001 --output_dir /data/results/run_0001"
            );
        }

        #[test]
        fn submit_missing_program_err() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("no-such-tsp");
            let err = Spooler::new(&missing)
                .submit(
                    "run_0001",
                    Path::new("/opt/pipeline/main.sh"),
                    Path::new("/in"),
                    Path::new("/out"),
                )
                .unwrap_err();
            assert!(matches!(err, SpoolError::Spawn { .. }));
        }
    }
}
