//! Bulk processing: one transform applied to many images, packed into a ZIP.
//!
//! Each entry runs decode → transform → encode on its own, in parallel on the
//! global [rayon](https://docs.rs/rayon) pool. Results always come back in
//! submission order, whatever order the workers finish in.
//!
//! ## Failure policy
//!
//! | Policy | On an item error |
//! |---|---|
//! | [`BatchPolicy::FailFast`] (default) | Items not yet started are skipped; the first error in input order is returned; no archive |
//! | [`BatchPolicy::BestEffort`] | The error is recorded in [`BatchOutcome::failures`]; the other items still run |
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is checked before each item starts. Items already running
//! finish; a cancelled batch returns [`BatchError::Cancelled`].

use crate::archive::{self, ArchiveError};
use crate::imaging::{
    Dimensions, ImageBackend, NamedOutput, OutputFormat, OutputSpec, PipelineError, Quality,
    ResizeTarget, SourceFile, encode_output, with_decoded_image,
};
use crate::imaging::transform;
use crate::naming;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{source_name}: {error}")]
    Item {
        index: usize,
        source_name: String,
        #[source]
        error: PipelineError,
    },
    #[error("batch cancelled")]
    Cancelled,
    #[error("no images to process")]
    Empty,
    #[error("every image failed ({0} errors)")]
    NothingSucceeded(usize),
    #[error("could not build archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// What happens to the rest of a batch when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    #[default]
    FailFast,
    BestEffort,
}

impl FromStr for BatchPolicy {
    type Err = crate::imaging::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(Self::FailFast),
            "best-effort" => Ok(Self::BestEffort),
            _ => Err(crate::imaging::ParseError {
                kind: "batch policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Cloneable, thread-safe cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The transform every entry of a batch goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchTransform {
    /// Re-encode only.
    Convert,
    /// Resize to `width`, height following the source aspect ratio.
    Resize { width: u32 },
    /// Resize to exact dimensions.
    Exact(Dimensions),
}

/// An ordered list of inputs with their output specs. Consumed by [`run`].
#[derive(Debug, Clone)]
pub struct BatchJob {
    entries: Vec<(SourceFile, OutputSpec)>,
    transform: BatchTransform,
}

impl BatchJob {
    pub fn new(transform: BatchTransform) -> Self {
        Self {
            entries: Vec::new(),
            transform,
        }
    }

    /// Build a job encoding every file as `format`, named `<stem>.<ext>`.
    pub fn for_files(
        files: Vec<SourceFile>,
        format: OutputFormat,
        quality: Option<Quality>,
        transform: BatchTransform,
    ) -> Self {
        let mut job = Self::new(transform);
        for file in files {
            let spec = OutputSpec::for_source(&file.name, format, quality);
            job.push(file, spec);
        }
        job
    }

    pub fn push(&mut self, file: SourceFile, spec: OutputSpec) {
        self.entries.push((file, spec));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn transform(&self) -> BatchTransform {
        self.transform
    }
}

/// Progress notifications, sent as items finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemFinished {
        index: usize,
        file_name: String,
        bytes: usize,
    },
    ItemFailed {
        index: usize,
        source_name: String,
        error: String,
    },
}

#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub source_name: String,
    pub error: PipelineError,
}

/// Successful outputs (input order) plus per-item failures.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outputs: Vec<NamedOutput>,
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    /// Some items failed but at least one succeeded.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Pack the successful outputs into a ZIP.
    pub fn to_archive(&self) -> Result<Vec<u8>, BatchError> {
        Ok(archive::pack_zip(&self.outputs)?)
    }
}

enum ItemResult {
    Done(NamedOutput),
    Failed(PipelineError),
    Skipped,
}

fn run_item(
    backend: &impl ImageBackend,
    file: &SourceFile,
    spec: &OutputSpec,
    op: BatchTransform,
) -> Result<NamedOutput, PipelineError> {
    with_decoded_image(backend, file, |image| {
        let target = match op {
            BatchTransform::Convert => return encode_output(backend, image.surface(), spec),
            BatchTransform::Resize { width } => ResizeTarget::Width(width),
            BatchTransform::Exact(dims) => ResizeTarget::Exact(dims),
        };
        let dims = target.resolve(image.dimensions())?;
        let resized = transform::resize(image.surface(), dims);
        encode_output(backend, &resized, spec)
    })
}

/// Run every entry of `job`.
///
/// Output names are made unique (case-insensitively) before any work starts.
pub fn run(
    backend: &impl ImageBackend,
    job: BatchJob,
    policy: BatchPolicy,
    cancel: &CancelToken,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchOutcome, BatchError> {
    if job.is_empty() {
        return Err(BatchError::Empty);
    }
    let BatchJob {
        mut entries,
        transform,
    } = job;

    let mut names: Vec<String> = entries.iter().map(|(_, spec)| spec.file_name.clone()).collect();
    naming::disambiguate(&mut names);
    for ((_, spec), name) in entries.iter_mut().zip(names) {
        spec.file_name = name;
    }

    let total = entries.len();
    if let Some(tx) = &events {
        let _ = tx.send(BatchEvent::Started { total });
    }
    debug!(total, ?policy, ?transform, "starting batch");

    let abort = AtomicBool::new(false);
    let results: Vec<ItemResult> = entries
        .par_iter()
        .enumerate()
        .map_with(events, |tx, (index, (file, spec))| {
            if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                return ItemResult::Skipped;
            }
            match run_item(backend, file, spec, transform) {
                Ok(output) => {
                    if let Some(tx) = tx {
                        let _ = tx.send(BatchEvent::ItemFinished {
                            index,
                            file_name: output.file_name.clone(),
                            bytes: output.bytes.len(),
                        });
                    }
                    ItemResult::Done(output)
                }
                Err(error) => {
                    warn!(source = %file.name, "batch item failed: {error}");
                    if policy == BatchPolicy::FailFast {
                        abort.store(true, Ordering::SeqCst);
                    }
                    if let Some(tx) = tx {
                        let _ = tx.send(BatchEvent::ItemFailed {
                            index,
                            source_name: file.name.clone(),
                            error: error.to_string(),
                        });
                    }
                    ItemResult::Failed(error)
                }
            }
        })
        .collect();

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    let mut skipped = 0;
    for (index, (result, (file, _))) in results.into_iter().zip(entries).enumerate() {
        match result {
            ItemResult::Done(output) => outputs.push(output),
            ItemResult::Failed(error) => failures.push(ItemFailure {
                index,
                source_name: file.name,
                error,
            }),
            ItemResult::Skipped => skipped += 1,
        }
    }

    if policy == BatchPolicy::FailFast {
        if let Some(first) = failures.into_iter().next() {
            return Err(BatchError::Item {
                index: first.index,
                source_name: first.source_name,
                error: first.error,
            });
        }
        if skipped > 0 {
            return Err(BatchError::Cancelled);
        }
        return Ok(BatchOutcome {
            outputs,
            failures: Vec::new(),
        });
    }
    if skipped > 0 {
        return Err(BatchError::Cancelled);
    }
    if outputs.is_empty() {
        return Err(BatchError::NothingSucceeded(failures.len()));
    }
    Ok(BatchOutcome { outputs, failures })
}
