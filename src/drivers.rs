//! Per-phase drivers.
//!
//! Each driver performs exactly one turn: render prompts, open the turn on
//! the session, sample the backend, decode against the phase schema, run the
//! phase's semantic validators and only then advance the session.

use serde_json::Value;
use tracing::{info, warn};

use crate::client::{GenerationBackend, GenerationResult, RawResponse, TurnRequest, decode_payload};
use crate::config::ValidationSection;
use crate::errors::{HarnessError, HarnessResult};
use crate::phase::Phase;
use crate::prompts::{PromptRenderer, PromptVars};
use crate::schemas::{Narration, Plan, SceneBuild, SceneQc, SceneSpec, StructuredOutput};
use crate::session::{ConversationSession, ResponseFormat};
use crate::validate::{validate_collections_usage, validate_timing_execution};

pub struct Generator<'a> {
    backend: &'a dyn GenerationBackend,
    renderer: &'a PromptRenderer,
    validation: &'a ValidationSection,
    last_sampled_id: Option<String>,
}

impl<'a> Generator<'a> {
    pub fn new(
        backend: &'a dyn GenerationBackend,
        renderer: &'a PromptRenderer,
        validation: &'a ValidationSection,
    ) -> Self {
        Self {
            backend,
            renderer,
            validation,
            last_sampled_id: None,
        }
    }

    /// Id of the last response received from the backend, accepted or not.
    pub fn last_sampled_id(&self) -> Option<&str> {
        self.last_sampled_id.as_deref()
    }

    async fn run_turn<T, F>(
        &mut self,
        session: &mut ConversationSession,
        phase: Phase,
        vars: PromptVars,
        retry_context: Option<&str>,
        semantic_check: F,
    ) -> HarnessResult<GenerationResult<T>>
    where
        T: StructuredOutput,
        F: FnOnce(&T, &RawResponse) -> HarnessResult<()>,
    {
        let prompt = self.renderer.render(phase.template_key(), &vars, retry_context)?;
        let turn = session.begin_turn(
            phase,
            ResponseFormat::for_phase(phase),
            phase.uses_web_search(),
        );
        info!(
            phase = %phase,
            anchor = ?turn.previous_response_id,
            retry = retry_context.is_some(),
            "Starting turn"
        );

        let raw = self.backend.sample(&TurnRequest { turn, prompt }).await?;
        if raw.id.trim().is_empty() {
            return Err(HarnessError::Operational(anyhow::anyhow!(
                "Generation backend returned a response without an id"
            )));
        }
        self.last_sampled_id = Some(raw.id.clone());

        let payload = decode_payload::<T>(phase, &raw)?;
        if let Err(e) = semantic_check(&payload, &raw) {
            warn!(phase = %phase, response_id = %raw.id, error = %e, "Semantic validation failed");
            return Err(e);
        }

        session.advance(raw.id.clone())?;
        Ok(GenerationResult {
            payload,
            response_id: raw.id.clone(),
            raw_response: raw,
        })
    }

    pub async fn generate_plan(
        &mut self,
        session: &mut ConversationSession,
        topic: &str,
        retry_context: Option<&str>,
    ) -> HarnessResult<GenerationResult<Plan>> {
        let vars = PromptVars::from([("topic", topic.to_string())]);
        self.run_turn(session, Phase::Plan, vars, retry_context, |_, _| Ok(()))
            .await
    }

    /// Narration must cover every scene of the plan, in count.
    pub async fn generate_narration(
        &mut self,
        session: &mut ConversationSession,
        plan: &Value,
        retry_context: Option<&str>,
    ) -> HarnessResult<GenerationResult<Narration>> {
        let expected = plan["scenes"].as_array().map(Vec::len);
        let plan_json = serde_json::to_string_pretty(plan)
            .map_err(|e| HarnessError::Operational(anyhow::Error::new(e)))?;
        let vars = PromptVars::from([("plan", plan_json)]);

        self.run_turn(
            session,
            Phase::Narration,
            vars,
            retry_context,
            |narration: &Narration, _| match expected {
                Some(expected) if expected != narration.scenes.len() => {
                    Err(HarnessError::semantic(format!(
                        "Narration covers {} scenes but the plan has {}.",
                        narration.scenes.len(),
                        expected
                    )))
                }
                _ => Ok(()),
            },
        )
        .await
    }

    /// Build a scene body. Timing validation is mandatory; collections
    /// usage only warns.
    pub async fn generate_scene(
        &mut self,
        session: &mut ConversationSession,
        scene_spec: &SceneSpec,
        scene_id: &str,
        retry_context: Option<&str>,
    ) -> HarnessResult<GenerationResult<SceneBuild>> {
        let vars = PromptVars::from([
            ("scene_id", scene_id.to_string()),
            ("scene_title", scene_spec.title.clone()),
            ("scene_description", scene_spec.description.clone()),
            ("narration_duration", scene_spec.narration_duration.to_string()),
            ("visual_ideas", scene_spec.visual_ideas.join(", ")),
        ]);
        let timing_marker = self.validation.timing_marker.clone();
        let prefix = self.validation.collections_prefix.clone();

        self.run_turn(
            session,
            Phase::BuildScenes,
            vars,
            retry_context,
            |_: &SceneBuild, raw| {
                validate_timing_execution(raw, &timing_marker)?;
                validate_collections_usage(raw, scene_id, &prefix);
                Ok(())
            },
        )
        .await
    }

    /// Review a scene. A failing verdict is a normal payload, not an error.
    pub async fn run_scene_qc(
        &mut self,
        session: &mut ConversationSession,
        scene_id: &str,
        scene_file_content: &str,
        retry_context: Option<&str>,
    ) -> HarnessResult<GenerationResult<SceneQc>> {
        let vars = PromptVars::from([
            ("scene_id", scene_id.to_string()),
            ("scene_file_content", scene_file_content.to_string()),
        ]);
        self.run_turn(session, Phase::SceneQc, vars, retry_context, |_, _| Ok(()))
            .await
    }

    /// Repair a scene given the reason it failed. The failure reason is part
    /// of the user prompt, so no separate retry section is appended.
    pub async fn repair_scene(
        &mut self,
        session: &mut ConversationSession,
        scene_id: &str,
        scene_file_content: &str,
        failure_reason: &str,
    ) -> HarnessResult<GenerationResult<SceneBuild>> {
        let vars = PromptVars::from([
            ("scene_id", scene_id.to_string()),
            ("scene_file_content", scene_file_content.to_string()),
            ("failure_reason", failure_reason.to_string()),
        ]);
        let prefix = self.validation.collections_prefix.clone();

        self.run_turn(
            session,
            Phase::SceneRepair,
            vars,
            None,
            |_: &SceneBuild, raw| {
                validate_collections_usage(raw, scene_id, &prefix);
                Ok(())
            },
        )
        .await
    }
}
