//! The conversion scheduler.
//!
//! [`run`] turns every file of a [`FileManifest`] into an HTML page. One task
//! is spawned per file straight away on a dedicated worker pool; an
//! [`AdmissionGate`] of capacity `C` decides how many of them may be reading,
//! rendering and writing at the same time. The driver only waits: it does no
//! per-file I/O of its own.
//!
//! ## Per-task protocol
//!
//! ```text
//! acquire token
//!   └─ read source ─► menu + transform ─► output name
//!        └─ ensure output dir ─► write temp file ─► rename into output dir
//! release token (on drop, whatever happened above)
//! ```
//!
//! ## Failure isolation
//!
//! Per-file problems (unreadable source, failed write or rename, a name
//! without a recognized suffix, even a panic) end that task only. They are
//! logged and recorded as a [`TaskStatus::Failed`] in the [`RunReport`]; every
//! other task proceeds. Only problems that make the whole run meaningless,
//! such as an output directory that cannot be created, surface as a
//! [`RunError`].
//!
//! ## Cancellation
//!
//! Tasks check a shared [`CancelFlag`] right after admission. A cancelled
//! task gives its token back without touching the output directory. Tasks
//! already past that point finish normally, and since output is renamed into
//! place only once complete, the output directory never holds partial pages.

use crate::assets::StyleAsset;
use crate::config::BuildConfig;
use crate::gate::AdmissionGate;
use crate::menu;
use crate::naming::{self, NamingError};
use crate::scan::FileManifest;
use crate::transform;
use std::any::Any;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Problems that abort the whole run before any task starts.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Problems confined to a single file.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Cannot open file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read content of file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot move output into {path}: {source}")]
    Relocate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug)]
pub enum TaskStatus {
    /// The page was written to `output`.
    Written { output: PathBuf },
    Failed(TaskError),
    /// Cancelled before any I/O.
    Cancelled,
}

/// What happened to one source file.
#[derive(Debug)]
pub struct TaskOutcome {
    pub source: String,
    pub status: TaskStatus,
}

/// Outcome of every task of a run, in manifest order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
    /// Most tasks that held an admission token at the same time.
    pub peak_in_flight: usize,
}

impl RunReport {
    pub fn written(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TaskStatus::Written { output } => Some((o.source.as_str(), output.as_path())),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            TaskStatus::Failed(err) => Some((o.source.as_str(), err)),
            _ => None,
        })
    }

    pub fn written_count(&self) -> usize {
        self.written().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TaskStatus::Cancelled))
            .count()
    }

    /// True when every file was written.
    pub fn is_success(&self) -> bool {
        self.written_count() == self.outcomes.len()
    }
}

/// Shared request to stop admitting new work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
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

/// Read-only inputs every task of a run borrows.
struct TaskContext<'a> {
    config: &'a BuildConfig,
    manifest: &'a FileManifest,
    menu: &'a [u8],
    style: &'a [u8],
    gate: &'a AdmissionGate,
    cancel: &'a CancelFlag,
}

/// Convert every file of `manifest`, waiting for all of them.
pub fn run(
    config: &BuildConfig,
    manifest: &FileManifest,
    style: &StyleAsset,
) -> Result<RunReport, RunError> {
    run_with_cancel(config, manifest, style, &CancelFlag::new())
}

/// [`run`], stopping admission of new tasks once `cancel` is set.
pub fn run_with_cancel(
    config: &BuildConfig,
    manifest: &FileManifest,
    style: &StyleAsset,
    cancel: &CancelFlag,
) -> Result<RunReport, RunError> {
    if manifest.is_empty() {
        return Ok(RunReport::default());
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| RunError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.pool_threads.max(config.concurrency))
        .thread_name(|i| format!("mdg-worker-{i}"))
        .build()?;
    let gate = AdmissionGate::new(config.concurrency);

    // Every task sees the same manifest, so the menu is built once.
    let menu = if config.skip_menu {
        Vec::new()
    } else {
        menu::build_menu_with(manifest.files(), &config.extensions, &config.menu)
    };

    let ctx = TaskContext {
        config,
        manifest,
        menu: &menu,
        style: style.as_bytes(),
        gate: &gate,
        cancel,
    };

    info!(
        files = manifest.len(),
        concurrency = gate.capacity(),
        output = %config.output_dir.display(),
        "starting conversion"
    );

    let (tx, rx) = mpsc::channel();
    pool.scope(|scope| {
        for (index, name) in manifest.files().iter().enumerate() {
            let tx = tx.clone();
            let ctx = &ctx;
            scope.spawn(move |_| {
                let status = guarded_task(ctx, name);
                // The receiver outlives the scope.
                let _ = tx.send((index, status));
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<TaskStatus>> = Vec::new();
    slots.resize_with(manifest.len(), || None);
    for (index, status) in rx {
        slots[index] = Some(status);
    }

    let outcomes: Vec<TaskOutcome> = manifest
        .files()
        .iter()
        .zip(slots)
        .map(|(name, status)| TaskOutcome {
            source: name.clone(),
            status: status.unwrap_or_else(|| {
                TaskStatus::Failed(TaskError::Panicked("task never reported".into()))
            }),
        })
        .collect();

    let report = RunReport {
        outcomes,
        peak_in_flight: gate.peak(),
    };
    info!(
        written = report.written_count(),
        failed = report.failure_count(),
        cancelled = report.cancelled_count(),
        "conversion finished"
    );
    Ok(report)
}

/// Run one task, turning a panic into a failure of that task alone.
fn guarded_task(ctx: &TaskContext<'_>, name: &str) -> TaskStatus {
    let status = match panic::catch_unwind(AssertUnwindSafe(|| convert_one(ctx, name))) {
        Ok(Ok(Some(output))) => TaskStatus::Written { output },
        Ok(Ok(None)) => TaskStatus::Cancelled,
        Ok(Err(err)) => TaskStatus::Failed(err),
        Err(payload) => TaskStatus::Failed(TaskError::Panicked(panic_message(payload.as_ref()))),
    };
    match &status {
        TaskStatus::Written { output } => {
            debug!(file = name, output = %output.display(), "converted")
        }
        TaskStatus::Failed(err) => warn!(file = name, error = %err, "conversion failed"),
        TaskStatus::Cancelled => debug!(file = name, "cancelled before start"),
    }
    status
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// The per-file protocol. `Ok(None)` means the task was cancelled.
fn convert_one(ctx: &TaskContext<'_>, name: &str) -> Result<Option<PathBuf>, TaskError> {
    let _token = ctx.gate.acquire();
    if ctx.cancel.is_cancelled() {
        return Ok(None);
    }

    let source_path = ctx.manifest.path_of(name);
    let content = read_source(&source_path)?;

    let page = transform::transform(&content, ctx.menu, ctx.style, ctx.config.skip_menu);
    let output_name = naming::output_name(name, &ctx.config.extensions)?;

    ensure_output_dir(&ctx.config.output_dir)?;
    let destination = ctx.config.output_dir.join(output_name);
    persist(ctx.config.staging_dir(), &destination, &page)?;
    Ok(Some(destination))
}

fn read_source(path: &Path) -> Result<Vec<u8>, TaskError> {
    let mut file = File::open(path).map_err(|source| TaskError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|source| TaskError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content)
}

/// Idempotent; concurrent callers racing on creation all succeed.
fn ensure_output_dir(dir: &Path) -> Result<(), TaskError> {
    fs::create_dir_all(dir).map_err(|source| TaskError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Stage `bytes` in a fresh temp file under `staging_dir`, then rename it
/// over `destination`. The temp file is removed if either step fails.
fn persist(staging_dir: &Path, destination: &Path, bytes: &[u8]) -> Result<(), TaskError> {
    let write_err = |source| TaskError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".mdg-").suffix(".html.tmp");
    // Same mode as a plain `fs::write`: 0o666 minus the umask, not tempfile's 0o600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut staged = builder.tempfile_in(staging_dir).map_err(write_err)?;
    staged.write_all(bytes).map_err(write_err)?;
    staged.flush().map_err(write_err)?;

    staged
        .persist(destination)
        .map_err(|err| TaskError::Relocate {
            path: destination.to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}
