//! Where atlas generation runs: inline on the caller's thread or on a background worker.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::foundation::error::{ForgeError, ForgeResult};
use crate::foundation::fingerprint::ContentKey;
use crate::scene::graph::SceneNode;
use crate::sprite::atlas::SpriteAtlas;
use crate::sprite::flatten::FlattenOptions;
use crate::sprite::pose::{AnimationState, Direction};

/// Coarse progress: one report per finished `(state, direction)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlattenProgress {
    pub completed: usize,
    pub total: usize,
    pub state: AnimationState,
    pub direction: Direction,
}

/// Everything a generator needs to produce one atlas.
#[derive(Clone, Debug)]
pub struct FlattenJob {
    pub key: ContentKey,
    /// Figure with the side-scroller representation already applied.
    pub scene: SceneNode,
    /// Normalized options.
    pub options: FlattenOptions,
    cancel: Arc<AtomicBool>,
}

impl FlattenJob {
    pub fn new(key: ContentKey, scene: SceneNode, options: FlattenOptions) -> Self {
        Self {
            key,
            scene,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

/// Produces an atlas for a job.
pub trait AtlasGenerator: Send + Sync {
    fn generate(
        &self,
        job: &FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas>;
}

/// Runs a flatten job to completion and reports its progress to the caller.
pub trait TaskRunner {
    fn run(
        &self,
        generator: Arc<dyn AtlasGenerator>,
        job: FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas>;
}

/// Generates on the calling thread, blocking it for every capture.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncTaskRunner;

impl TaskRunner for SyncTaskRunner {
    fn run(
        &self,
        generator: Arc<dyn AtlasGenerator>,
        job: FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        generator.generate(&job, progress)
    }
}

/// Messages from a background worker.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(FlattenProgress),
    Done(Box<SpriteAtlas>),
    Failed(ForgeError),
}

/// Generates on a dedicated background thread and talks to the caller over a channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerTaskRunner;

impl WorkerTaskRunner {
    /// Start a worker for `job`. The caller owns the returned handle and with it the worker.
    pub fn spawn(
        &self,
        generator: Arc<dyn AtlasGenerator>,
        job: FlattenJob,
    ) -> ForgeResult<WorkerHandle> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = Arc::clone(&job.cancel);
        let thread = std::thread::Builder::new()
            .name("sprite-flatten".to_string())
            .spawn(move || worker_main(generator.as_ref(), &job, &tx))
            .map_err(|e| ForgeError::worker(format!("failed to spawn worker: {e}")))?;
        Ok(WorkerHandle {
            rx,
            cancel,
            thread: Some(thread),
        })
    }
}

impl TaskRunner for WorkerTaskRunner {
    fn run(
        &self,
        generator: Arc<dyn AtlasGenerator>,
        job: FlattenJob,
        progress: &mut dyn FnMut(FlattenProgress),
    ) -> ForgeResult<SpriteAtlas> {
        self.spawn(generator, job)?.wait(progress)
    }
}

fn worker_main(generator: &dyn AtlasGenerator, job: &FlattenJob, tx: &Sender<WorkerMessage>) {
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        generator.generate(job, &mut |p| {
            // A closed channel means the caller went away; the cancel flag ends the job.
            let _ = tx.send(WorkerMessage::Progress(p));
        })
    }));
    let msg = match outcome {
        Ok(Ok(atlas)) => WorkerMessage::Done(Box::new(atlas)),
        Ok(Err(e)) => WorkerMessage::Failed(e),
        Err(payload) => WorkerMessage::Failed(ForgeError::worker(format!(
            "worker panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    let _ = tx.send(msg);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owner of a running worker. Dropping it terminates the worker.
pub struct WorkerHandle {
    rx: Receiver<WorkerMessage>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Forward progress until the worker finishes, then join it.
    pub fn wait(mut self, progress: &mut dyn FnMut(FlattenProgress)) -> ForgeResult<SpriteAtlas> {
        let result = loop {
            match self.rx.recv() {
                Ok(WorkerMessage::Progress(p)) => progress(p),
                Ok(WorkerMessage::Done(atlas)) => break Ok(*atlas),
                Ok(WorkerMessage::Failed(e)) => break Err(e),
                Err(_) => {
                    break Err(ForgeError::worker(
                        "worker channel closed before completion",
                    ));
                }
            }
        };
        self.join()?;
        result
    }

    /// Ask the worker to stop and wait for it to exit.
    pub fn terminate(mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Err(e) = self.join() {
            tracing::warn!(error = %e, "sprite worker ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn join(&mut self) -> ForgeResult<()> {
        match self.thread.take() {
            Some(t) => t
                .join()
                .map_err(|_| ForgeError::worker("worker thread panicked outside the job")),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.store(true, Ordering::Release);
            let _ = self.join();
        }
    }
}

/// Runner selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRunnerKind {
    /// Pick by host capability.
    #[default]
    Auto,
    Worker,
    Sync,
}

impl TaskRunnerKind {
    /// Background workers when the host offers more than one hardware thread.
    pub fn detect() -> TaskRunnerKind {
        match std::thread::available_parallelism() {
            Ok(n) if n.get() > 1 => TaskRunnerKind::Worker,
            _ => TaskRunnerKind::Sync,
        }
    }

    pub fn resolve(self) -> TaskRunnerKind {
        match self {
            TaskRunnerKind::Auto => Self::detect(),
            other => other,
        }
    }

    pub fn runner(self) -> Box<dyn TaskRunner> {
        match self.resolve() {
            TaskRunnerKind::Worker => Box::new(WorkerTaskRunner),
            _ => Box::new(SyncTaskRunner),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sprite/runner.rs"]
mod tests;
