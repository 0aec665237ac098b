//! The single-consumer game engine and its background worker pools.
//!
//! All player and world state lives inside the engine loop. Everything else
//! (network readers, worker jobs, the cycle timer) can only reach that state
//! by pushing a [`Task`] onto the engine's queue.

use crate::packet::PacketManager;
use crate::task::{Context, Task, TickTask};
use crate::world::World;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Illegal-state conditions. These are programming errors and are reported
/// to the caller, never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("the engine is already running")]
    AlreadyRunning,
    #[error("the engine is already stopped")]
    AlreadyStopped,
    #[error("the world has already been initialized")]
    AlreadyInitialized,
    #[error("the world has not been initialized")]
    NotInitialized,
}

/// A unit of blocking work for one of the pools.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

type TaskQueue = mpsc::UnboundedReceiver<Box<dyn Task>>;

/// Bounded pool for blocking or CPU heavy jobs.
///
/// At most `capacity` jobs run at once; further submissions wait for a free
/// slot instead of queueing without bound.
#[derive(Debug, Clone)]
pub struct TaskService {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl TaskService {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `job` on the blocking pool, waiting first while the pool is
    /// saturated.
    pub async fn submit<F, R>(&self, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        // The semaphore is never closed, so acquiring only fails if it is.
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
    }
}

/// Serial pool: jobs run one after another, never two at once.
#[derive(Debug, Clone)]
pub struct WorkService {
    jobs: mpsc::UnboundedSender<Job>,
}

impl WorkService {
    /// Spawns the worker. Must be called within a Tokio runtime.
    pub fn spawn() -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = tokio::task::spawn_blocking(job).await {
                    error!("Work job failed: {}", e);
                }
            }
        });
        Self { jobs }
    }

    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.jobs.send(Box::new(job)).is_err() {
            error!("Work service has shut down, dropping job");
            return false;
        }
        true
    }
}

/// Cloneable access to the engine from any thread.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tasks: mpsc::UnboundedSender<Box<dyn Task>>,
    task_service: TaskService,
    work_service: WorkService,
}

impl EngineHandle {
    /// Queues a task for the engine loop. Returns false once the engine has
    /// been dropped.
    pub fn push_task<T: Task>(&self, task: T) -> bool {
        self.push_boxed(Box::new(task))
    }

    pub fn push_boxed(&self, task: Box<dyn Task>) -> bool {
        if let Err(e) = self.tasks.send(task) {
            error!("Failed to queue task {}: engine is gone", e.0.name());
            return false;
        }
        true
    }

    /// Runs a job on the bounded pool. See [`TaskService::submit`].
    pub async fn submit<F, R>(&self, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.task_service.submit(job).await
    }

    /// Runs a job on the serial pool.
    pub fn submit_work<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.work_service.submit(job)
    }
}

/// Stop signal of one `start()`. Each run gets its own, so stopping and
/// restarting never revives a loop that has not exited yet.
struct Run {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

/// The engine lifecycle: `Stopped` until [`GameEngine::start`], `Running`
/// until [`GameEngine::stop`].
pub struct GameEngine {
    handle: EngineHandle,
    tasks: Arc<Mutex<TaskQueue>>,
    run: Option<Run>,
    thread: Option<JoinHandle<World>>,
}

impl GameEngine {
    /// Creates a stopped engine whose bounded pool has `workers` slots.
    /// Must be called within a Tokio runtime.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle: EngineHandle {
                tasks: tx,
                task_service: TaskService::new(workers),
                work_service: WorkService::spawn(),
            },
            tasks: Arc::new(Mutex::new(rx)),
            run: None,
            thread: None,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn push_task<T: Task>(&self, task: T) -> bool {
        self.handle.push_task(task)
    }

    /// Binds `world` to this engine and spawns the consumer loop.
    ///
    /// If a previous loop was stopped but never joined, the new loop waits
    /// for it to exit before taking any task.
    pub fn start(&mut self, mut world: World, packets: PacketManager) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        world.init(self.handle())?;

        let run_state = Run {
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        };
        let context = Context::new(self.handle(), world, packets);
        let previous = self.thread.take();
        let tasks = Arc::clone(&self.tasks);
        let running = Arc::clone(&run_state.running);
        let wake = Arc::clone(&run_state.wake);

        self.thread = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                match previous.await {
                    Ok(old) => debug!(
                        "Previous run exited with {} players online",
                        old.players().len()
                    ),
                    Err(e) => error!("Previous engine loop ended abnormally: {}", e),
                }
            }
            run(tasks, running, wake, context).await
        }));
        self.run = Some(run_state);
        Ok(())
    }

    /// Asks the loop to exit. A task already executing runs to completion.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        let run = self.run.take().ok_or(EngineError::AlreadyStopped)?;
        run.running.store(false, Ordering::Release);
        run.wake.notify_one();
        Ok(())
    }

    /// Waits for a stopped loop to exit and hands back its world.
    pub async fn join(&mut self) -> Option<World> {
        let thread = self.thread.take()?;
        match thread.await {
            Ok(world) => Some(world),
            Err(e) => {
                error!("Engine loop ended abnormally: {}", e);
                None
            }
        }
    }
}

async fn run(
    tasks: Arc<Mutex<TaskQueue>>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    mut context: Context,
) -> World {
    let mut tasks = tasks.lock().await;
    info!("Game engine started");

    while running.load(Ordering::Acquire) {
        tokio::select! {
            biased;
            // Woken by stop() or a stale permit; either way re-check the flag.
            _ = wake.notified() => continue,
            task = tasks.recv() => match task {
                Some(task) => context.execute(task),
                None => break,
            },
        }
    }

    info!("Game engine stopped");
    context.into_world()
}

/// Pushes a [`TickTask`] every `period` until the engine goes away.
pub fn spawn_cycle(engine: EngineHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        timer.tick().await;

        loop {
            timer.tick().await;
            if !engine.push_task(TickTask) {
                break;
            }
        }
    })
}
