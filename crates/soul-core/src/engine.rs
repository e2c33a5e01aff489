//! Non-streaming request pipeline.
//!
//! ```text
//! start → faculties → confidence → escalate | synthesize → result
//! ```
//!
//! The three faculties run concurrently and all must finish before
//! confidence is computed. In combined mode one call replaces them.

use soul_council::{FacultyOutputs, SynthesisResult};
use soul_monitor::UsageAccumulator;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::{SharedConfig, SoulConfig};
use crate::error::SoulError;
use crate::pipeline::{conclude, run_combined, run_faculty, Collaborators, Conclusion};
use crate::result::RequestResult;
use crate::Result;

/// Runs a request to completion and returns a single [`RequestResult`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    collaborators: Collaborators,
    config: SharedConfig,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, config: SharedConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Processes `message`.
    ///
    /// Configuration is snapshotted once at the start; a concurrent update
    /// only affects later requests.
    ///
    /// # Errors
    ///
    /// Under the isolating failure policy this only fails on internal
    /// faults. Under fail-fast the first faulting stage is returned as
    /// [`SoulError::Council`].
    pub async fn process(&self, message: &str) -> Result<RequestResult> {
        let span = info_span!("request", request_id = %Uuid::new_v4());
        self.run(message).instrument(span).await
    }

    async fn run(&self, message: &str) -> Result<RequestResult> {
        let config = self.config.snapshot();
        let start = Instant::now();
        let mut usage = UsageAccumulator::new();

        let outputs = self.faculties(message, &config, &mut usage).await?;
        let assessment = config.aggregator().assess(&outputs);

        let conclusion = conclude(
            &self.collaborators,
            &config,
            message,
            &outputs,
            &assessment,
            &mut usage,
        )
        .await?;

        let (synthesis, trainer_needed) = match conclusion {
            Conclusion::Synthesized(synthesis) => (synthesis, None),
            Conclusion::Escalated(escalation) => {
                (SynthesisResult::awaiting_trainer(config.weights), Some(escalation))
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            mode = %assessment.mode,
            weighted = assessment.weighted,
            elapsed_ms,
            total_tokens = usage.total().total_tokens(),
            "request complete"
        );

        Ok(RequestResult {
            outputs,
            synthesis,
            confidence: assessment,
            mode: assessment.mode,
            trainer_needed,
            elapsed_ms,
            token_usage: usage.summary(),
        })
    }

    async fn faculties(
        &self,
        message: &str,
        config: &Arc<SoulConfig>,
        usage: &mut UsageAccumulator,
    ) -> Result<FacultyOutputs> {
        let policy = config.pipeline.failure_policy;

        if config.pipeline.combined_mode {
            let runner = self.collaborators.combined();
            let (outputs, combined_usage) =
                run_combined(&runner, message, &config.combined_settings(), policy).await?;
            usage.record(combined_usage);
            return Ok(outputs);
        }

        let settings = config.faculty_settings();
        let [manas, buddhi, sanskaras] = self.collaborators.runners();
        let (m, b, s) = tokio::try_join!(
            run_faculty(manas.as_ref(), message, &settings, policy),
            run_faculty(buddhi.as_ref(), message, &settings, policy),
            run_faculty(sanskaras.as_ref(), message, &settings, policy),
        )?;

        for (_, faculty_usage) in [&m, &b, &s] {
            usage.record(*faculty_usage);
        }
        FacultyOutputs::collect([m.0, b.0, s.0])
            .ok_or_else(|| SoulError::Internal("faculty outputs incomplete".to_string()))
    }
}
