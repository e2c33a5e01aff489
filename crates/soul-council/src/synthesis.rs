//! Synthesis of the three faculty voices into one answer.

use serde::{Deserialize, Serialize};
use soul_completion::CompletionService;
use soul_monitor::UsageCounters;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::confidence::FacultyWeights;
use crate::error::{CouncilError, Result, Stage};
use crate::faculty::{CallSettings, FacultyOutputs};
use crate::prompts;

/// Response returned in place of a synthesis while the trainer is consulted.
pub const AWAITING_TRAINER_RESPONSE: &str =
    "I'm not yet sure how to respond to this. I've asked my trainer for guidance.";

/// The final answer and the weights it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub response: String,
    pub weights: FacultyWeights,
}

impl SynthesisResult {
    /// Fixed result for the escalation branch; no completion call is made.
    pub fn awaiting_trainer(weights: FacultyWeights) -> Self {
        Self {
            response: AWAITING_TRAINER_RESPONSE.to_string(),
            weights,
        }
    }

    /// Apology standing in for a failed synthesis.
    pub fn apology(cause: &str, weights: FacultyWeights) -> Self {
        Self {
            response: format!("The soul struggles to integrate: {cause}"),
            weights,
        }
    }
}

/// Builds the synthesis prompt and calls the completion service.
#[derive(Clone)]
pub struct Synthesizer {
    completion: Arc<dyn CompletionService>,
}

impl Synthesizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// User turn embedding each voice with its weight, confidence and detail.
    pub fn prompt(message: &str, outputs: &FacultyOutputs, weights: &FacultyWeights) -> String {
        let reasoning = if outputs.buddhi.reasoning_chain.is_empty() {
            "N/A".to_string()
        } else {
            outputs.buddhi.reasoning_chain.join(" -> ")
        };
        let habits = if outputs.sanskaras.activated_habits.is_empty() {
            "None".to_string()
        } else {
            outputs
                .sanskaras
                .activated_habits
                .iter()
                .map(|h| h.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "The user said: \"{message}\"\n\n\
             Here are the three inner voices:\n\n\
             **Manas (Mind)** [weight: {mw:.0}%, confidence: {mc:.2}, valence: {mv:+.2}]:\n{mr}\n\n\
             **Buddhi (Intellect)** [weight: {bw:.0}%, confidence: {bc:.2}]:\n{br}\n\
             Reasoning: {reasoning}\n\n\
             **Sanskaras (Habits)** [weight: {sw:.0}%, confidence: {sc:.2}]:\n{sr}\n\
             Activated habits: {habits}\n\n\
             Synthesize these into a unified, wise response. Honor all three voices \
             proportional to their weights.",
            mw = weights.manas * 100.0,
            mc = outputs.manas.confidence,
            mv = outputs.manas.valence,
            mr = outputs.manas.response,
            bw = weights.buddhi * 100.0,
            bc = outputs.buddhi.confidence,
            br = outputs.buddhi.response,
            sw = weights.sanskaras * 100.0,
            sc = outputs.sanskaras.confidence,
            sr = outputs.sanskaras.response,
        )
    }

    /// Synthesizes, surfacing any fault.
    pub async fn synthesize(
        &self,
        message: &str,
        outputs: &FacultyOutputs,
        weights: FacultyWeights,
        call: &CallSettings,
    ) -> Result<(SynthesisResult, UsageCounters)> {
        let request = call.request(prompts::SYNTHESIS, Self::prompt(message, outputs, &weights));
        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| CouncilError::completion(Stage::Synthesis, e, UsageCounters::zero()))?;

        debug!(chars = completion.text.len(), "synthesis complete");
        Ok((
            SynthesisResult {
                response: completion.text,
                weights,
            },
            completion.usage,
        ))
    }

    /// Synthesizes, degrading to an apology on a fault.
    pub async fn synthesize_or_apologize(
        &self,
        message: &str,
        outputs: &FacultyOutputs,
        weights: FacultyWeights,
        call: &CallSettings,
    ) -> (SynthesisResult, UsageCounters) {
        match self.synthesize(message, outputs, weights, call).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "synthesis degraded");
                (SynthesisResult::apology(&err.cause(), weights), err.usage())
            }
        }
    }
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faculty::{ActivatedHabit, BuddhiOutput, ManasOutput, SanskarasOutput};
    use soul_completion::ScriptedCompletion;

    fn outputs() -> FacultyOutputs {
        FacultyOutputs {
            manas: ManasOutput {
                response: "It feels tender.".to_string(),
                confidence: 0.8,
                valence: 0.4,
            },
            buddhi: BuddhiOutput {
                response: "Loss asks for patience.".to_string(),
                confidence: 0.9,
                reasoning_chain: vec!["loss hurts".to_string(), "time helps".to_string()],
            },
            sanskaras: SanskarasOutput {
                response: "I reach for care.".to_string(),
                confidence: 0.7,
                activated_habits: vec![ActivatedHabit::named("care")],
            },
        }
    }

    fn call() -> CallSettings {
        CallSettings {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_prompt_embeds_every_voice() {
        let prompt = Synthesizer::prompt("i lost my dog", &outputs(), &FacultyWeights::default());
        assert!(prompt.contains("The user said: \"i lost my dog\""));
        assert!(prompt.contains("[weight: 35%, confidence: 0.80, valence: +0.40]"));
        assert!(prompt.contains("[weight: 40%, confidence: 0.90]"));
        assert!(prompt.contains("Reasoning: loss hurts -> time helps"));
        assert!(prompt.contains("[weight: 25%, confidence: 0.70]"));
        assert!(prompt.contains("Activated habits: care"));
    }

    #[test]
    fn test_prompt_placeholders_for_empty_details() {
        let mut outs = outputs();
        outs.buddhi.reasoning_chain.clear();
        outs.sanskaras.activated_habits.clear();
        let prompt = Synthesizer::prompt("hi", &outs, &FacultyWeights::default());
        assert!(prompt.contains("Reasoning: N/A"));
        assert!(prompt.contains("Activated habits: None"));
    }

    #[tokio::test]
    async fn test_synthesis_uses_call_settings() {
        let svc = Arc::new(ScriptedCompletion::new().on("You are the Atman", "Be gentle with yourself."));
        let synth = Synthesizer::new(svc.clone());

        let (result, usage) = synth
            .synthesize("i lost my dog", &outputs(), FacultyWeights::default(), &call())
            .await
            .unwrap();
        assert_eq!(result.response, "Be gentle with yourself.");
        assert_eq!(result.weights, FacultyWeights::default());
        assert!(!usage.is_zero());
        assert_eq!(svc.requests()[0].max_tokens, Some(512));
    }

    #[tokio::test]
    async fn test_fault_becomes_apology_with_weights() {
        let svc = Arc::new(ScriptedCompletion::new().fail_on("You are the Atman", "rate limited"));
        let synth = Synthesizer::new(svc);
        let weights = FacultyWeights::new(0.2, 0.5, 0.3);

        let (result, usage) = synth
            .synthesize_or_apologize("hi", &outputs(), weights, &call())
            .await;
        assert!(result.response.starts_with("The soul struggles to integrate"));
        assert!(result.response.contains("rate limited"));
        assert_eq!(result.weights, weights);
        assert!(usage.is_zero());
    }
}
