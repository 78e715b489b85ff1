use std::process::{ExitCode, Termination};

/// Fatal, startup-time failures.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("could not open header of {path}: {source}")]
    HeaderOpen { path: String, source: anyhow::Error },
    #[error("output directory not writable: {0}")]
    OutputNotWritable(String),
}

impl Termination for AppError {
    fn report(self) -> ExitCode {
        ExitCode::from(1)
    }
}

/// Why a single record was rejected during decoding or ingest.
///
/// Kept separate from `AppError`: these are expected, per-record outcomes
/// that ingest logs at `debug` and skips, never a reason to abort.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("missing INFO/SVTYPE and non-symbolic ALT")]
    MissingSvType,
    #[error("BND ALT allele could not be parsed")]
    UnparseableBnd,
    #[error("record has more than two alleles")]
    MultiAllelic,
    #[error("SVTYPE/CT combination does not map to a known svt")]
    UnknownCtSvTypeCombination,
    #[error("unknown chromosome")]
    UnknownChromosome,
}
