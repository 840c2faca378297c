/// Fixed-rate load driver.
///
/// A record's latency is response arrival minus the tick's scheduled
/// instant. Time spent waiting in the completion queue for a slow consumer
/// is not part of it.
use crate::error::AppError;
use crate::http::client::InferenceClient;
use crate::models::ModelSchema;
use crate::payload::PayloadBuilder;
use crate::simulator::config::{DriverConfig, FailurePolicy};
use crate::simulator::record::{CompletionRecord, DriverStats, DriverSummary};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Completions in the order responses arrive (not tick order).
pub type CompletionStream = mpsc::Receiver<CompletionRecord>;

/// Control handle for a running driver.
pub struct DriverHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<DriverSummary, AppError>>,
}

impl DriverHandle {
    /// Ask the driver to stop. In-flight dispatches are abandoned.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the driver to stop.
    ///
    /// Resolves to the run counters after a cancellation, a closed stream
    /// or an elapsed duration, and to the first fatal dispatch error
    /// otherwise.
    pub async fn wait(self) -> Result<DriverSummary, AppError> {
        self.task
            .await
            .map_err(|e| AppError::Task(format!("load driver task failed: {}", e)))?
    }
}

/// Issues one inference request per tick at a fixed rate.
pub struct LoadDriver<C> {
    client: Arc<C>,
    schema: Arc<ModelSchema>,
    builder: Arc<PayloadBuilder>,
    config: DriverConfig,
}

impl<C: InferenceClient + 'static> LoadDriver<C> {
    /// Create a driver using the default datatype table.
    pub fn new(client: Arc<C>, schema: ModelSchema, config: DriverConfig) -> Self {
        Self {
            client,
            schema: Arc::new(schema),
            builder: Arc::new(PayloadBuilder::default()),
            config,
        }
    }

    pub fn with_builder(mut self, builder: PayloadBuilder) -> Self {
        self.builder = Arc::new(builder);
        self
    }

    /// Start ticking on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails without spawning anything if the config is invalid or the
    /// schema cannot be turned into a request.
    pub fn start(self) -> Result<(CompletionStream, DriverHandle), AppError> {
        self.start_with_cancel(CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `cancel` fires.
    pub fn start_with_cancel(
        self,
        cancel: CancellationToken,
    ) -> Result<(CompletionStream, DriverHandle), AppError> {
        self.config.validate()?;
        self.builder.build(&self.schema)?;

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let task = tokio::spawn(self.run(tx, cancel.clone()));

        Ok((rx, DriverHandle { cancel, task }))
    }

    async fn run(
        self,
        tx: mpsc::Sender<CompletionRecord>,
        cancel: CancellationToken,
    ) -> Result<DriverSummary, AppError> {
        let LoadDriver {
            client,
            schema,
            builder,
            config,
        } = self;
        let period = config.tick_interval()?;
        let config = Arc::new(config);

        // Child token: a fatal dispatch stops this run without touching the caller's token.
        let stop = cancel.child_token();
        let fatal = Arc::new(FatalSlot::default());
        let stats = Arc::new(DriverStats::default());
        let semaphore = Arc::new(Semaphore::new(config.max_in_flight));

        let start = Instant::now();
        let wall_start = SystemTime::now();
        let first_tick = start
            .checked_add(period)
            .ok_or_else(|| AppError::Config(format!("Tick interval {:?} is out of range", period)))?;
        let mut ticker = time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = config
            .duration
            .map(|d| {
                start
                    .checked_add(d)
                    .ok_or_else(|| AppError::Config(format!("Duration {:?} is out of range", d)))
            })
            .transpose()?;
        let run_limit = async move {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(run_limit);

        tracing::info!(
            model = %config.model,
            rate_hz = config.rate_hz,
            interval_us = period.as_micros() as u64,
            max_in_flight = config.max_in_flight,
            queue_capacity = config.queue_capacity,
            "load driver started"
        );

        let mut tasks = JoinSet::new();
        let mut seq = 0u64;

        let outcome: Result<(), AppError> = loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break Ok(()),
                _ = &mut run_limit => {
                    tracing::info!("run duration elapsed");
                    break Ok(());
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            break Err(AppError::Task(format!("dispatch task panicked: {}", e)));
                        }
                    }
                }
                tick = ticker.tick() => {
                    if tx.is_closed() {
                        tracing::info!("completion stream closed, stopping");
                        break Ok(());
                    }

                    seq += 1;
                    DriverStats::incr(&stats.ticks);

                    let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                        DriverStats::incr(&stats.skipped);
                        tracing::warn!(seq, "in-flight limit reached, skipping tick");
                        continue;
                    };

                    let dispatch = Dispatch {
                        seq,
                        tick: wall_start + tick.duration_since(start),
                        tick_instant: tick,
                        client: client.clone(),
                        schema: schema.clone(),
                        builder: builder.clone(),
                        config: config.clone(),
                        tx: tx.clone(),
                        stop: stop.clone(),
                        stats: stats.clone(),
                        fatal: fatal.clone(),
                    };
                    tasks.spawn(dispatch.run(permit));
                }
            }
        };

        stop.cancel();
        tasks.shutdown().await;

        let summary = stats.snapshot();
        let outcome = match fatal.take() {
            Some(err) => Err(err),
            None => outcome,
        };

        match &outcome {
            Ok(()) => tracing::info!(
                ticks = summary.ticks,
                dispatched = summary.dispatched,
                completed = summary.completed,
                dropped = summary.dropped,
                skipped = summary.skipped,
                "load driver stopped"
            ),
            Err(err) => tracing::error!(error = %err, "load driver aborted"),
        }

        outcome.map(|()| summary)
    }
}

/// First fatal error raised by any dispatch.
#[derive(Default)]
struct FatalSlot(Mutex<Option<AppError>>);

impl FatalSlot {
    fn record(&self, err: AppError) {
        if let Ok(mut slot) = self.0.lock() {
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }

    fn take(&self) -> Option<AppError> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// One tick's worth of work.
struct Dispatch<C> {
    seq: u64,
    tick: SystemTime,
    tick_instant: Instant,
    client: Arc<C>,
    schema: Arc<ModelSchema>,
    builder: Arc<PayloadBuilder>,
    config: Arc<DriverConfig>,
    tx: mpsc::Sender<CompletionRecord>,
    stop: CancellationToken,
    stats: Arc<DriverStats>,
    fatal: Arc<FatalSlot>,
}

impl<C: InferenceClient> Dispatch<C> {
    async fn run(self, permit: OwnedSemaphorePermit) {
        let _permit = permit;
        DriverStats::incr(&self.stats.dispatched);

        if let Err(err) = self.execute().await {
            tracing::error!(seq = self.seq, error = %err, "dispatch failed, aborting run");
            self.fatal.record(err);
            self.stop.cancel();
        }
    }

    async fn execute(&self) -> Result<(), AppError> {
        let request = self.builder.build(&self.schema)?;

        let mut attempt = 0u32;
        loop {
            let err = match self.client.infer(&self.config.model, &request).await {
                Ok(()) => break,
                Err(err) => err,
            };

            match self.config.policy_for(&err) {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::Retry if attempt < self.config.retries => {
                    let delay = DriverConfig::backoff(attempt);
                    tracing::debug!(
                        seq = self.seq,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying dispatch"
                    );
                    attempt += 1;
                    tokio::select! {
                        _ = self.stop.cancelled() => return Ok(()),
                        _ = time::sleep(delay) => {}
                    }
                }
                FailurePolicy::Drop | FailurePolicy::Retry => {
                    DriverStats::incr(&self.stats.dropped);
                    tracing::warn!(
                        seq = self.seq,
                        attempts = attempt + 1,
                        error = %err,
                        "dispatch failed, dropping tick"
                    );
                    return Ok(());
                }
            }
        }

        let record = CompletionRecord {
            seq: self.seq,
            tick: self.tick,
            tick_instant: self.tick_instant,
            latency: self.tick_instant.elapsed(),
        };

        tokio::select! {
            biased;
            _ = self.stop.cancelled() => {}
            sent = self.tx.send(record) => match sent {
                Ok(()) => DriverStats::incr(&self.stats.completed),
                Err(_) => tracing::debug!(seq = self.seq, "completion stream closed"),
            },
        }

        Ok(())
    }
}
