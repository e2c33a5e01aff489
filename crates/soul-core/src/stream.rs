//! Streaming request pipeline.
//!
//! The same stages as [`Orchestrator`](crate::Orchestrator), reported as an
//! ordered sequence of [`SoulEvent`]s:
//!
//! ```text
//! start, {manas, buddhi, sanskaras in arrival order}, confidence,
//! needs_trainer | synthesis, done
//! ```
//!
//! A fatal fault emits `error` and ends the stream without `done`. Dropping
//! the stream stops the driver and cancels in-flight faculty calls.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use soul_council::{
    ConfidenceAssessment, CouncilError, Faculty, FacultyOutput, FacultyOutputs, FacultyWeights,
    ProcessingMode, TrainerEscalation,
};
use soul_monitor::{UsageAccumulator, UsageCounters, UsageSummary};
use soul_registry::RecordId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{SharedConfig, SoulConfig};
use crate::pipeline::{conclude, run_combined, run_faculty, Collaborators, Conclusion};

/// Events buffered between the driver and a slow consumer.
const EVENT_BUFFER: usize = 16;

/// Stream of events for one request.
pub type SoulEventStream = ReceiverStream<SoulEvent>;

/// One step of a streamed request.
#[derive(Debug, Clone, PartialEq)]
pub enum SoulEvent {
    Start {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A faculty finished; the event is named after the faculty.
    Faculty(FacultyOutput),
    Confidence {
        weighted: f64,
        threshold: f64,
        escalation_enabled: bool,
    },
    NeedsTrainer {
        record_id: Option<RecordId>,
        trigger_summary: String,
        question_context: String,
        elapsed_ms: u64,
    },
    Synthesis {
        response: String,
        weights: FacultyWeights,
        mode: ProcessingMode,
        elapsed_ms: u64,
    },
    Done {
        elapsed_ms: u64,
        token_usage: UsageSummary,
    },
    Error {
        module: Option<Faculty>,
        error: String,
    },
}

impl SoulEvent {
    /// Event name as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            SoulEvent::Start { .. } => "start",
            SoulEvent::Faculty(output) => output.faculty().name(),
            SoulEvent::Confidence { .. } => "confidence",
            SoulEvent::NeedsTrainer { .. } => "needs_trainer",
            SoulEvent::Synthesis { .. } => "synthesis",
            SoulEvent::Done { .. } => "done",
            SoulEvent::Error { .. } => "error",
        }
    }

    /// JSON payload with snake_case keys.
    pub fn payload(&self) -> Value {
        match self {
            SoulEvent::Start { message, timestamp } => json!({
                "message": message,
                "timestamp": timestamp.to_rfc3339(),
            }),
            SoulEvent::Faculty(output) => {
                let mut payload = serde_json::to_value(output).unwrap_or_else(|_| json!({}));
                if let Value::Object(map) = &mut payload {
                    map.insert("module".to_string(), json!(output.faculty()));
                }
                payload
            }
            SoulEvent::Confidence {
                weighted,
                threshold,
                escalation_enabled,
            } => json!({
                "weighted": weighted,
                "threshold": threshold,
                "escalation_enabled": escalation_enabled,
            }),
            SoulEvent::NeedsTrainer {
                record_id,
                trigger_summary,
                question_context,
                elapsed_ms,
            } => json!({
                "record_id": record_id,
                "trigger_summary": trigger_summary,
                "question_context": question_context,
                "elapsed_ms": elapsed_ms,
            }),
            SoulEvent::Synthesis {
                response,
                weights,
                mode,
                elapsed_ms,
            } => json!({
                "response": response,
                "weights": weights,
                "mode": mode,
                "elapsed_ms": elapsed_ms,
            }),
            SoulEvent::Done {
                elapsed_ms,
                token_usage,
            } => json!({
                "elapsed_ms": elapsed_ms,
                "token_usage": token_usage,
            }),
            SoulEvent::Error { module, error } => match module {
                Some(faculty) => json!({ "module": faculty, "error": error }),
                None => json!({ "error": error }),
            },
        }
    }

    /// Renders a server-sent-events frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.payload())
    }

    /// Returns true for the events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SoulEvent::Done { .. } | SoulEvent::Error { .. })
    }

    fn confidence(assessment: &ConfidenceAssessment) -> Self {
        SoulEvent::Confidence {
            weighted: assessment.weighted,
            threshold: assessment.threshold,
            escalation_enabled: assessment.escalation_enabled,
        }
    }

    fn error(err: &CouncilError) -> Self {
        SoulEvent::Error {
            module: err.stage().faculty(),
            error: err.to_string(),
        }
    }
}

/// The consumer dropped the stream.
#[derive(Debug)]
struct Disconnected;

/// Sending half held by the driver.
struct Emitter {
    tx: mpsc::Sender<SoulEvent>,
}

impl Emitter {
    async fn emit(&self, event: SoulEvent) -> Result<(), Disconnected> {
        debug!(event = event.name(), "emit");
        self.tx.send(event).await.map_err(|_| Disconnected)
    }
}

/// Runs requests and reports their progress as [`SoulEvent`]s.
#[derive(Debug, Clone)]
pub struct StreamingOrchestrator {
    collaborators: Collaborators,
    config: SharedConfig,
}

impl StreamingOrchestrator {
    pub fn new(collaborators: Collaborators, config: SharedConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Starts processing `message` on a background task.
    ///
    /// Must be called within a Tokio runtime.
    pub fn stream(&self, message: impl Into<String>) -> SoulEventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let driver = Driver {
            collaborators: self.collaborators.clone(),
            config: self.config.snapshot(),
            message: message.into(),
            cancel: CancellationToken::new(),
        };

        let span = info_span!("stream", request_id = %Uuid::new_v4());
        tokio::spawn(driver.run(tx).instrument(span));
        ReceiverStream::new(rx)
    }
}

/// State of one streamed request.
struct Driver {
    collaborators: Collaborators,
    config: Arc<SoulConfig>,
    message: String,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(self, tx: mpsc::Sender<SoulEvent>) {
        let watcher = tx.clone();
        let cancel = self.cancel.clone();
        let emitter = Emitter { tx };

        tokio::select! {
            _ = watcher.closed() => {
                cancel.cancel();
                info!("consumer disconnected, request abandoned");
            }
            result = self.drive(&emitter) => {
                cancel.cancel();
                if result.is_err() {
                    info!("consumer disconnected, request abandoned");
                }
            }
        }
    }

    async fn drive(&self, emitter: &Emitter) -> Result<(), Disconnected> {
        let start = Instant::now();
        let mut usage = UsageAccumulator::new();

        emitter
            .emit(SoulEvent::Start {
                message: self.message.clone(),
                timestamp: Utc::now(),
            })
            .await?;

        let outputs = if self.config.pipeline.combined_mode {
            self.combined(emitter, &mut usage).await?
        } else {
            self.fan_in(emitter, &mut usage).await?
        };
        let Some(outputs) = outputs else {
            return Ok(());
        };

        let assessment = self.config.aggregator().assess(&outputs);
        emitter.emit(SoulEvent::confidence(&assessment)).await?;

        let conclusion = conclude(
            &self.collaborators,
            &self.config,
            &self.message,
            &outputs,
            &assessment,
            &mut usage,
        )
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match conclusion {
            Ok(Conclusion::Escalated(TrainerEscalation {
                record_id,
                trigger_summary,
                question_context,
            })) => {
                emitter
                    .emit(SoulEvent::NeedsTrainer {
                        record_id,
                        trigger_summary,
                        question_context,
                        elapsed_ms,
                    })
                    .await?;
            }
            Ok(Conclusion::Synthesized(synthesis)) => {
                emitter
                    .emit(SoulEvent::Synthesis {
                        response: synthesis.response,
                        weights: synthesis.weights,
                        mode: assessment.mode,
                        elapsed_ms,
                    })
                    .await?;
            }
            Err(err) => {
                warn!(error = %err, "stream ended by fault");
                return emitter.emit(SoulEvent::error(&err)).await;
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            mode = %assessment.mode,
            weighted = assessment.weighted,
            elapsed_ms,
            "stream complete"
        );
        emitter
            .emit(SoulEvent::Done {
                elapsed_ms,
                token_usage: usage.summary(),
            })
            .await
    }

    /// One call, then the three faculty events in fixed order.
    async fn combined(
        &self,
        emitter: &Emitter,
        usage: &mut UsageAccumulator,
    ) -> Result<Option<FacultyOutputs>, Disconnected> {
        let runner = self.collaborators.combined();
        let settings = self.config.combined_settings();
        let policy = self.config.pipeline.failure_policy;

        let outputs = match run_combined(&runner, &self.message, &settings, policy).await {
            Ok((outputs, combined_usage)) => {
                usage.record(combined_usage);
                outputs
            }
            Err(err) => {
                warn!(error = %err, "combined faculties failed");
                emitter.emit(SoulEvent::error(&err)).await?;
                return Ok(None);
            }
        };

        for output in outputs.in_order() {
            emitter.emit(SoulEvent::Faculty(output)).await?;
        }
        Ok(Some(outputs))
    }

    /// Three concurrent faculty tasks; each event is emitted as it arrives.
    async fn fan_in(
        &self,
        emitter: &Emitter,
        usage: &mut UsageAccumulator,
    ) -> Result<Option<FacultyOutputs>, Disconnected> {
        let settings = Arc::new(self.config.faculty_settings());
        let policy = self.config.pipeline.failure_policy;
        let message: Arc<str> = Arc::from(self.message.as_str());

        let mut tasks: JoinSet<Option<Arrival>> = JoinSet::new();
        for runner in self.collaborators.runners() {
            let settings = settings.clone();
            let message = message.clone();
            let cancel = self.cancel.child_token();
            tasks.spawn(async move {
                let faculty = runner.faculty();
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = run_faculty(runner.as_ref(), &message, &settings, policy) => {
                        Some(Arrival { faculty, result })
                    }
                }
            });
        }

        let mut arrived = Vec::with_capacity(3);
        while let Some(joined) = tasks.join_next().await {
            let arrival = match joined {
                Ok(Some(arrival)) => arrival,
                Ok(None) => continue,
                Err(err) => {
                    self.cancel.cancel();
                    tasks.shutdown().await;
                    warn!(error = %err, "faculty task did not finish");
                    emitter
                        .emit(SoulEvent::Error {
                            module: None,
                            error: format!("faculty task failed: {err}"),
                        })
                        .await?;
                    return Ok(None);
                }
            };

            match arrival.result {
                Ok((output, faculty_usage)) => {
                    usage.record(faculty_usage);
                    emitter.emit(SoulEvent::Faculty(output.clone())).await?;
                    arrived.push(output);
                }
                Err(err) => {
                    self.cancel.cancel();
                    tasks.shutdown().await;
                    warn!(faculty = %arrival.faculty, error = %err, "faculty failed, cancelling siblings");
                    emitter.emit(SoulEvent::error(&err)).await?;
                    return Ok(None);
                }
            }
        }

        match FacultyOutputs::collect(arrived) {
            Some(outputs) => Ok(Some(outputs)),
            None => {
                emitter
                    .emit(SoulEvent::Error {
                        module: None,
                        error: "faculty outputs incomplete".to_string(),
                    })
                    .await?;
                Ok(None)
            }
        }
    }
}

/// One faculty's result as it reaches the fan-in point.
struct Arrival {
    faculty: Faculty,
    result: Result<(FacultyOutput, UsageCounters), CouncilError>,
}
