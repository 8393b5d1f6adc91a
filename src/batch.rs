// Batch processing: one file at a time, each from a clean state. A failure
// is recorded against its file and the batch moves on.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};

use crate::api::{content_type_for, Compressor};
use crate::compress::{CompressionOutcome, Shrinker};
use crate::config::{MaxRatio, RunConfig};
use crate::error::CompressError;
use crate::interrupt::Interrupt;
use crate::output::{destination, write_output};
use crate::ui::{display_name, Reporter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Single,
    Recursive(MaxRatio),
}

#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: CompressionOutcome,
    pub bytes_written: u64,
}

#[derive(Debug)]
pub struct FileFailure {
    pub source: PathBuf,
    pub error: CompressError,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn bytes_saved(&self) -> u64 {
        self.reports
            .iter()
            .map(|r| r.outcome.original_size.saturating_sub(r.bytes_written))
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compress one file and write the result. Nothing here outlives the call.
pub fn process_file<C: Compressor + ?Sized>(
    compressor: &C,
    config: &RunConfig,
    reporter: &dyn Reporter,
    interrupt: &Interrupt,
    source: &Path,
) -> Result<FileReport, CompressError> {
    let label = display_name(source);
    let data = fs::read(source).map_err(|e| CompressError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let content_type = content_type_for(source);

    let shrinker = Shrinker::new(compressor, &config.retry, reporter, interrupt);
    let outcome = match config.mode {
        Mode::Single => shrinker.single(&label, &data, content_type)?,
        Mode::Recursive(max) => shrinker.recursive(&label, &data, content_type, max)?,
    };

    let bytes = shrinker.download(&outcome.last.output_url)?;
    let dest = destination(
        source,
        config.output_dir.as_deref(),
        config.naming,
        &outcome.last.output_url,
    )?;
    write_output(&dest, &bytes)?;
    reporter.saved(&label, &dest);

    Ok(FileReport {
        source: source.to_path_buf(),
        destination: dest,
        outcome,
        bytes_written: bytes.len() as u64,
    })
}

pub fn run_batch<C: Compressor + ?Sized>(
    compressor: &C,
    config: &RunConfig,
    reporter: &dyn Reporter,
    interrupt: &Interrupt,
    files: &[PathBuf],
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for file in files {
        let span = info_span!("file", path = %file.display());
        let _enter = span.enter();

        reporter.batch_item(file);
        match process_file(compressor, config, reporter, interrupt, file) {
            Ok(report) => {
                info!(destination = %report.destination.display(), ratio = report.outcome.overall_ratio, "Compressed");
                summary.reports.push(report);
            }
            Err(e) => {
                error!("Failed to compress {}: {}", file.display(), e);
                reporter.failed(&display_name(file), &e);
                summary.failures.push(FileFailure {
                    source: file.clone(),
                    error: e,
                });
            }
        }
    }

    reporter.summary(&summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ShrinkReply;
    use crate::compress::{CompressionResult, StopReason};
    use crate::config::RetryPolicy;
    use crate::output::OutputNaming;
    use crate::ui::Silent;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Halves whatever it is given. Uploads containing `poison` are
    /// answered with a malformed reply.
    struct HalvingServer {
        poison: Vec<u8>,
        stored: RefCell<HashMap<String, Vec<u8>>>,
        seen: RefCell<Vec<Vec<u8>>>,
    }

    impl HalvingServer {
        fn new(poison: &[u8]) -> Self {
            HalvingServer {
                poison: poison.to_vec(),
                stored: RefCell::new(HashMap::new()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Compressor for HalvingServer {
        fn shrink(&self, data: &[u8], _content_type: &str) -> Result<ShrinkReply, CompressError> {
            self.seen.borrow_mut().push(data.to_vec());
            if data == self.poison.as_slice() {
                return Err(CompressError::MalformedResponse("broken upload".into()));
            }
            let out = data[..data.len() / 2].to_vec();
            let url = format!("https://x/out{}", self.stored.borrow().len());
            let ratio = out.len() as f64 / data.len() as f64;
            let result = CompressionResult::from_server(data.len() as u64, out.len() as u64, ratio, url.clone());
            self.stored.borrow_mut().insert(url, out);
            Ok(ShrinkReply::Accepted(result))
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, CompressError> {
            self.stored
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| CompressError::Status { status: 404, body: url.into() })
        }
    }

    fn run_config(mode: Mode, naming: OutputNaming, output_dir: Option<PathBuf>) -> RunConfig {
        RunConfig {
            mode,
            naming,
            output_dir,
            retry: RetryPolicy::new(2, Duration::ZERO, 1.0),
        }
    }

    #[test]
    fn test_failure_does_not_leak_between_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let files: Vec<PathBuf> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        fs::write(&files[0], b"aaaaaaaa").unwrap();
        fs::write(&files[1], b"poison").unwrap();
        fs::write(&files[2], b"cccc").unwrap();

        let server = HalvingServer::new(b"poison");
        let config = run_config(Mode::Single, OutputNaming::Suffixed, Some(out.clone()));
        let summary = run_batch(&server, &config, &Silent, &Interrupt::new(), &files);

        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].source, files[1]);
        assert!(!summary.is_success());

        assert_eq!(fs::read(out.join("a_compressed.png")).unwrap(), b"aaaa");
        assert_eq!(fs::read(out.join("c_compressed.png")).unwrap(), b"cc");
        assert!(!out.join("b_compressed.png").exists());

        // file 3 was uploaded from its own bytes, not leftovers of file 2
        assert_eq!(server.seen.borrow().last().unwrap(), b"cccc");
        assert_eq!(summary.reports[1].outcome.original_size, 4);
        assert_eq!(summary.bytes_saved(), 4 + 2);
    }

    #[test]
    fn test_missing_file_is_a_per_file_failure() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("here.png");
        fs::write(&present, b"xxxx").unwrap();
        let files = vec![dir.path().join("gone.png"), present.clone()];

        let server = HalvingServer::new(b"");
        let config = run_config(Mode::Single, OutputNaming::ServerAssigned, None);
        let summary = run_batch(&server, &config, &Silent, &Interrupt::new(), &files);

        assert!(matches!(summary.failures[0].error, CompressError::Read { .. }));
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].destination, dir.path().join("out0"));
        assert_eq!(fs::read(dir.path().join("out0")).unwrap(), b"xx");
    }

    /// Replays replies in order and sends a Ctrl+C on the given upload.
    struct SignalingServer {
        replies: RefCell<Vec<ShrinkReply>>,
        uploads: RefCell<usize>,
        signal_on: usize,
        interrupt: Interrupt,
    }

    impl Compressor for SignalingServer {
        fn shrink(&self, _data: &[u8], _content_type: &str) -> Result<ShrinkReply, CompressError> {
            *self.uploads.borrow_mut() += 1;
            if *self.uploads.borrow() == self.signal_on {
                assert!(self.interrupt.on_signal());
            }
            let mut replies = self.replies.borrow_mut();
            if replies.is_empty() {
                return Err(CompressError::MalformedResponse("script exhausted".into()));
            }
            Ok(replies.remove(0))
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, CompressError> {
            Ok(url.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_interrupt_does_not_carry_into_next_file() {
        let dir = tempdir().unwrap();
        let files: Vec<PathBuf> = ["a.png", "b.png"].iter().map(|n| dir.path().join(n)).collect();
        fs::write(&files[0], b"aaaaaaaa").unwrap();
        fs::write(&files[1], b"bbbbbb").unwrap();

        let accepted = |before, after, ratio, name: &str| {
            ShrinkReply::Accepted(CompressionResult::from_server(
                before,
                after,
                ratio,
                format!("https://x/{}", name),
            ))
        };
        let interrupt = Interrupt::new();
        let server = SignalingServer {
            replies: RefCell::new(vec![
                accepted(8, 4, 0.5, "a1"),
                // Ctrl+C arrives with this upload, inside a.png's loop
                accepted(4, 2, 0.5, "a2"),
                ShrinkReply::Rejected("TooManyRequests".into()),
                accepted(6, 3, 0.5, "b1"),
                accepted(3, 3, 1.0, "b2"),
            ]),
            uploads: RefCell::new(0),
            signal_on: 2,
            interrupt: interrupt.clone(),
        };
        let config = run_config(
            Mode::Recursive(MaxRatio::new(90.0)),
            OutputNaming::ServerAssigned,
            None,
        );
        let summary = run_batch(&server, &config, &Silent, &interrupt, &files);

        assert!(summary.is_success(), "failures: {:?}", summary.failures);
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.reports[0].outcome.stop, StopReason::Interrupted);
        assert_eq!(summary.reports[0].outcome.overall_ratio, 75.0);
        assert_eq!(summary.reports[1].outcome.stop, StopReason::NoFurtherGain);
        assert_eq!(summary.reports[1].outcome.rounds, 2);
        assert_eq!(fs::read(dir.path().join("b2")).unwrap(), b"https://x/b2");
        assert!(!interrupt.is_tripped());
    }

    #[test]
    fn test_recursive_overwrite_replaces_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("photo.png");
        fs::write(&source, vec![7u8; 1000]).unwrap();

        let server = HalvingServer::new(b"");
        let config = run_config(
            Mode::Recursive(MaxRatio::new(80.0)),
            OutputNaming::Overwrite,
            None,
        );
        let report = process_file(&server, &config, &Silent, &Interrupt::new(), &source).unwrap();

        // 1000 -> 500 -> 250 -> 125 reaches 87.5%
        assert_eq!(report.outcome.rounds, 3);
        assert_eq!(report.outcome.stop, StopReason::TargetReached);
        assert_eq!(report.outcome.overall_ratio, 87.5);
        assert_eq!(report.destination, source);
        assert_eq!(fs::read(&source).unwrap().len(), 125);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
