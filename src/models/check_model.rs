//! models/check_model.rs
//! Opciones y resultado de una corrida de `check`.

use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Limita la corrida a una sola plantilla (si está activa)
    pub template_code: Option<String>,
    /// Detecta y registra, pero no notifica ni avanza versiones
    pub dry_run: bool,
}

/// Estado final de una plantilla dentro de una corrida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateOutcome {
    Unchanged,
    Notified,
    NotifyFailed,
    DryRunSkipped,
    FetchFailed,
    Malformed,
    /// El registro respondió sin VERSION / DESCRIPTION_UPDATE
    MissingField,
    /// El cambio quedó registrado, pero falló un paso posterior
    FailedAfterRecord,
    Failed,
}

impl TemplateOutcome {
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            TemplateOutcome::Notified
                | TemplateOutcome::NotifyFailed
                | TemplateOutcome::DryRunSkipped
                | TemplateOutcome::FailedAfterRecord
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TemplateOutcome::FetchFailed
                | TemplateOutcome::Malformed
                | TemplateOutcome::FailedAfterRecord
                | TemplateOutcome::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateCheckResult {
    pub template_code: String,
    pub outcome: TemplateOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckSummary {
    pub dry_run: bool,
    pub checked: usize,
    pub updated_count: usize,
    pub error_count: usize,
    pub results: Vec<TemplateCheckResult>,
}

impl CheckSummary {
    pub fn new(dry_run: bool) -> Self {
        CheckSummary {
            dry_run,
            ..Default::default()
        }
    }

    pub fn record(&mut self, template_code: &str, outcome: TemplateOutcome) {
        self.checked += 1;
        if outcome.is_update() {
            self.updated_count += 1;
        }
        if outcome.is_error() {
            self.error_count += 1;
        }
        self.results.push(TemplateCheckResult {
            template_code: template_code.to_string(),
            outcome,
        });
    }
}
