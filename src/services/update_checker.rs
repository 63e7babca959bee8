//! services/update_checker.rs
//! Una corrida de `check`: por cada plantilla activa, consulta el registro,
//! parsea, compara, registra el cambio y notifica.
//!
//! La versión local solo avanza cuando la notificación se entregó. Las
//! corridas no se excluyen entre sí: dos corridas simultáneas sobre la misma
//! plantilla pueden duplicar registros y notificaciones.

use anyhow::Result;

use crate::{
    models::{
        check_model::{CheckOptions, CheckSummary, TemplateOutcome},
        template_model::TemplateRecord,
        update_model::UpdateRecord,
    },
    services::{
        ports::{TemplateSource, UpdateNotifier},
        response_parser::{parse_registry_response, ParseError},
        template_service::TemplateService,
        update_log_service::UpdateLogService,
    },
};

pub struct UpdateChecker<S, N> {
    template_service: TemplateService,
    update_log_service: UpdateLogService,
    source: S,
    notifier: N,
}

impl<S, N> UpdateChecker<S, N>
where
    S: TemplateSource,
    N: UpdateNotifier,
{
    pub fn new(
        template_service: TemplateService,
        update_log_service: UpdateLogService,
        source: S,
        notifier: N,
    ) -> Self {
        Self {
            template_service,
            update_log_service,
            source,
            notifier,
        }
    }

    /// Corre el chequeo completo. Solo falla si no se pueden leer las
    /// plantillas; los errores por plantilla se cuentan en el resumen.
    pub async fn run(&self, options: &CheckOptions) -> Result<CheckSummary> {
        let mut summary = CheckSummary::new(options.dry_run);

        let templates = self
            .template_service
            .list_active(options.template_code.as_deref())
            .await?;

        if templates.is_empty() {
            log::warn!("(run) No se encontraron plantillas activas para revisar");
            return Ok(summary);
        }

        log::info!(
            "(run) Iniciando revisión de {} plantillas{}",
            templates.len(),
            if options.dry_run { " [DRY RUN]" } else { "" }
        );

        for template in &templates {
            log::info!("(run) Revisando plantilla: {}", template.template_code);

            let outcome = match self.check_template(template, options.dry_run).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!(
                        "(run) Error procesando plantilla {}: {:?}",
                        template.template_code,
                        e
                    );
                    TemplateOutcome::Failed
                }
            };
            summary.record(&template.template_code, outcome);
        }

        log::info!(
            "(run) Revisión terminada: actualizadas={}, errores={}, revisadas={}",
            summary.updated_count,
            summary.error_count,
            summary.checked
        );
        if options.dry_run {
            log::warn!("(run) Corrida en modo DRY RUN - no se enviaron notificaciones");
        }

        Ok(summary)
    }

    async fn check_template(
        &self,
        template: &TemplateRecord,
        dry_run: bool,
    ) -> Result<TemplateOutcome> {
        let code = &template.template_code;

        // 1) Consultar el registro. Si falla no se toca last_checked.
        let raw_xml = match self.source.fetch(code, &template.current_version).await {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("(check_template) No se pudieron obtener datos para {}: {}", code, e);
                return Ok(TemplateOutcome::FetchFailed);
            }
        };

        // 2) Parsear
        let candidate = match parse_registry_response(&raw_xml, code) {
            Ok(candidate) => candidate,
            Err(ParseError::MissingField(field)) => {
                log::warn!(
                    "(check_template) {} no encontrado en la respuesta para {}",
                    field,
                    code
                );
                return Ok(TemplateOutcome::MissingField);
            }
            Err(e @ ParseError::Malformed(_)) => {
                log::error!("(check_template) Error parseando XML de {}: {}", code, e);
                return Ok(TemplateOutcome::Malformed);
            }
        };

        // 3) Sin cambios
        if candidate.new_version == template.current_version {
            log::info!(
                "(check_template) Versión al día: {} ({})",
                code,
                candidate.new_version
            );
            self.template_service
                .touch_last_checked(&template.id)
                .await?;
            return Ok(TemplateOutcome::Unchanged);
        }

        // 4) Cambio detectado: queda registrado como NOTSENT
        log::info!(
            "(check_template) Actualización detectada: {} {} → {}",
            code,
            template.current_version,
            candidate.new_version
        );
        let record = self
            .update_log_service
            .create_record(template, &candidate)
            .await?;

        // Desde aquí el cambio ya cuenta como actualización aunque algo falle
        match self.finish_update(template, &record, dry_run).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!(
                    "(check_template) Cambio registrado para {} pero falló el cierre: {:?}",
                    code,
                    e
                );
                Ok(TemplateOutcome::FailedAfterRecord)
            }
        }
    }

    async fn finish_update(
        &self,
        template: &TemplateRecord,
        record: &UpdateRecord,
        dry_run: bool,
    ) -> Result<TemplateOutcome> {
        let code = &template.template_code;

        if dry_run {
            log::warn!("(finish_update) [DRY RUN] Notificación NO enviada para {}", code);
            self.template_service
                .touch_last_checked(&template.id)
                .await?;
            return Ok(TemplateOutcome::DryRunSkipped);
        }

        // 5) Notificar; solo con entrega confirmada avanza la versión
        if self.notifier.notify(record).await {
            self.update_log_service.mark_delivered(record).await?;
            log::info!("(finish_update) Notificación enviada para {}", code);
            Ok(TemplateOutcome::Notified)
        } else {
            log::error!("(finish_update) Error enviando notificación para {}", code);
            self.template_service
                .touch_last_checked(&template.id)
                .await?;
            Ok(TemplateOutcome::NotifyFailed)
        }
    }
}
