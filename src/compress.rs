// Single-shot and recursive compression on top of a `Compressor`.

use std::thread;
use tracing::{debug, info};

use crate::api::{Compressor, ShrinkReply};
use crate::config::{MaxRatio, RetryPolicy};
use crate::error::CompressError;
use crate::interrupt::Interrupt;
use crate::ui::Reporter;

/// One accepted compression call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub size_before: u64,
    pub size_after: u64,
    /// Percentage shrink of this call.
    pub ratio: f64,
    pub output_url: String,
}

impl CompressionResult {
    /// `server_ratio` is output/input as a fraction.
    pub fn from_server(size_before: u64, size_after: u64, server_ratio: f64, output_url: String) -> Self {
        CompressionResult {
            size_before,
            size_after,
            ratio: round2(100.0 - server_ratio * 100.0),
            output_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SingleShot,
    NoFurtherGain,
    TargetReached,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    pub original_size: u64,
    pub last: CompressionResult,
    pub rounds: u32,
    pub overall_ratio: f64,
    pub stop: StopReason,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shrink from `before` to `after` as a percentage. Zero when `before` is 0.
pub fn cumulative_ratio(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) * 100.0 / before as f64
}

pub struct Shrinker<'a, C: Compressor + ?Sized> {
    compressor: &'a C,
    retry: &'a RetryPolicy,
    reporter: &'a dyn Reporter,
    interrupt: &'a Interrupt,
}

impl<'a, C: Compressor + ?Sized> Shrinker<'a, C> {
    pub fn new(
        compressor: &'a C,
        retry: &'a RetryPolicy,
        reporter: &'a dyn Reporter,
        interrupt: &'a Interrupt,
    ) -> Self {
        Shrinker {
            compressor,
            retry,
            reporter,
            interrupt,
        }
    }

    pub fn download(&self, url: &str) -> Result<Vec<u8>, CompressError> {
        self.compressor.download(url)
    }

    /// Upload `data` once, retrying rejected uploads per the retry policy.
    pub fn shrink(
        &self,
        label: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<CompressionResult, CompressError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.reporter.upload(label);

            match self.compressor.shrink(data, content_type)? {
                ShrinkReply::Accepted(result) => {
                    self.reporter.done(label, &result);
                    return Ok(result);
                }
                ShrinkReply::Rejected(reason) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(CompressError::RetriesExhausted {
                            attempts: attempt,
                            last: reason,
                        });
                    }
                    let delay = self.retry.delay_for(attempt);
                    info!(file = label, attempt, ?delay, %reason, "Upload rejected, retrying");
                    self.reporter.retry(label, attempt, self.retry.max_attempts, delay, &reason);
                    thread::sleep(delay);

                    if self.interrupt.is_interrupted() {
                        return Err(CompressError::Interrupted);
                    }
                }
            }
        }
    }

    pub fn single(
        &self,
        label: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<CompressionOutcome, CompressError> {
        let result = self.shrink(label, data, content_type)?;
        Ok(CompressionOutcome {
            original_size: result.size_before,
            overall_ratio: result.ratio,
            last: result,
            rounds: 1,
            stop: StopReason::SingleShot,
        })
    }

    /// Feed each output back in until the server reports no gain or the
    /// cumulative shrink from the original reaches `max`. An interrupt ends
    /// the loop early and keeps the last accepted result.
    pub fn recursive(
        &self,
        label: &str,
        data: &[u8],
        content_type: &str,
        max: MaxRatio,
    ) -> Result<CompressionOutcome, CompressError> {
        let mut last = self.shrink(label, data, content_type)?;
        let before = last.size_before;
        let mut rounds = 1;

        let _armed = self.interrupt.arm();
        let stop = loop {
            if last.ratio <= 0.0 {
                break StopReason::NoFurtherGain;
            }
            if cumulative_ratio(before, last.size_after) >= max.value() {
                break StopReason::TargetReached;
            }
            if self.interrupt.is_interrupted() {
                break StopReason::Interrupted;
            }

            let bytes = match self.compressor.download(&last.output_url) {
                Ok(bytes) => bytes,
                Err(_) if self.interrupt.is_interrupted() => break StopReason::Interrupted,
                Err(e) => return Err(e),
            };
            match self.shrink(label, &bytes, content_type) {
                Ok(next) => {
                    last = next;
                    rounds += 1;
                    debug!(file = label, rounds, size = last.size_after, "Recompressed");
                }
                Err(CompressError::Interrupted) => break StopReason::Interrupted,
                Err(e) => return Err(e),
            }
        };

        if stop == StopReason::Interrupted {
            self.reporter.interrupted(label);
        }

        let overall_ratio = round2(cumulative_ratio(before, last.size_after));
        info!(file = label, rounds, ?stop, overall_ratio, "Recursive compression finished");
        self.reporter.final_ratio(label, before, last.size_after, overall_ratio);

        Ok(CompressionOutcome {
            original_size: before,
            last,
            rounds,
            overall_ratio,
            stop,
        })
    }
}
