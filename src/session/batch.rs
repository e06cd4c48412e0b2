//! Batch add / replace pipeline
//!
//! This is the one place a failed line is skipped: parse errors (translated
//! when fallback is on), unknown pairs and render errors are logged, recorded
//! in [`BatchOutcome::failures`] and never abort the batch.

use panel_dsl::{parse_spec_line, PanelSpec};
use serde::Serialize;
use std::sync::Arc;
use wmb_agentic::SpecTranslator;

use super::{PanelRecord, PanelSession, Patch};
use crate::error::{PanelError, SessionError};
use crate::registry::PlotRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub line_idx: usize,
    pub line: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub patch: Patch,
    /// Keys of the panels created, in order
    pub added: Vec<String>,
    /// A leftover line that could have become a panel was dropped at the ceiling
    pub truncated: bool,
    pub failures: Vec<BatchFailure>,
}

#[derive(Clone)]
pub struct BatchPipeline {
    registry: Arc<PlotRegistry>,
    translator: Option<Arc<dyn SpecTranslator>>,
}

impl BatchPipeline {
    pub fn new(registry: Arc<PlotRegistry>) -> Self {
        Self {
            registry,
            translator: None,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn SpecTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn registry(&self) -> &Arc<PlotRegistry> {
        &self.registry
    }

    pub fn has_translator(&self) -> bool {
        self.translator.is_some()
    }

    /// Parse a line, asking the translator only when parsing fails and fallback is on
    pub async fn resolve_line(&self, line: &str, fallback: bool) -> Result<PanelSpec, PanelError> {
        match parse_spec_line(line) {
            Ok(spec) => Ok(spec),
            Err(parse_err) => match (&self.translator, fallback) {
                (Some(translator), true) => {
                    tracing::info!("Translating '{}' ({})", line, parse_err);
                    let spec = translator.translate(line).await?;
                    tracing::info!("Translated '{}' -> '{}'", line, spec);
                    Ok(spec)
                }
                _ => Err(parse_err.into()),
            },
        }
    }

    pub async fn add_batch<S: AsRef<str>>(
        &self,
        session: &mut PanelSession,
        lines: &[S],
        fallback: bool,
    ) -> BatchOutcome {
        let counter = session.next_batch();
        let mut outcome = BatchOutcome::default();

        for (line_idx, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            if session.is_full() {
                outcome.truncated = lines[line_idx..]
                    .iter()
                    .any(|rest| self.is_panel_candidate(rest.as_ref(), fallback));
                if outcome.truncated {
                    tracing::warn!(
                        "Session {}: panel ceiling {} reached, dropping remaining lines",
                        session.id,
                        session.max_panels()
                    );
                }
                break;
            }

            let key = format!("{}-{}", counter, line_idx);
            match self.render_line(&key, line, fallback).await {
                Ok(record) => {
                    outcome.patch.ops.push(session.append(record));
                    outcome.added.push(key);
                }
                Err(e) => {
                    tracing::warn!("Skipping line {} '{}': {}", line_idx, line, e);
                    outcome.failures.push(BatchFailure {
                        line_idx,
                        line: line.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Session {}: batch {} added {} panel(s), {} failure(s)",
            session.id,
            counter,
            outcome.added.len(),
            outcome.failures.len()
        );
        outcome
    }

    /// Whether a line would be attempted as a panel at all
    fn is_panel_candidate(&self, line: &str, fallback: bool) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        (fallback && self.translator.is_some()) || parse_spec_line(line).is_ok()
    }

    /// Re-render a live panel in place from a new line
    pub async fn replace(
        &self,
        session: &mut PanelSession,
        key: &str,
        line: &str,
        fallback: bool,
    ) -> Result<Patch, SessionError> {
        let position = session
            .position(key)
            .ok_or_else(|| SessionError::UnknownPanel(key.to_string()))?;
        let record = self.render_line(key, line, fallback).await.map_err(|e| {
            tracing::warn!("Keeping panel {} unchanged: {}", key, e);
            e
        })?;
        Ok(Patch {
            ops: vec![session.replace_at(position, record)],
        })
    }

    async fn render_line(
        &self,
        key: &str,
        line: &str,
        fallback: bool,
    ) -> Result<PanelRecord, PanelError> {
        let spec = self.resolve_line(line, fallback).await?;
        let view = self.registry.try_render(key, &spec)?;
        Ok(PanelRecord::new(key, spec.to_spec_string(), view))
    }
}
