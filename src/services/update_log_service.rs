use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::{
    models::{
        template_model::TemplateRecord,
        update_model::{ListUpdatesResponse, MessageStatus, UpdateCandidate, UpdateRecord},
    },
    services::db_timestamp,
};

const UPDATE_COLUMNS: &str = r#"
    u.id, u.template_id, t.template_code, u.old_version, u.new_version,
    u.has_validation_changes, u.message_status, u.raw_xml, u.created_at
"#;

#[derive(Clone, Debug)]
pub struct UpdateLogService {
    db_pool: Pool<Sqlite>,
}

impl UpdateLogService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        UpdateLogService { db_pool }
    }

    /// Guarda el cambio detectado, siempre como NOTSENT.
    /// `old_version` es la versión local en el momento de la detección.
    pub async fn create_record(
        &self,
        template: &TemplateRecord,
        candidate: &UpdateCandidate,
    ) -> Result<UpdateRecord> {
        let record = UpdateRecord {
            id: Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            template_code: template.template_code.clone(),
            old_version: template.current_version.clone(),
            new_version: candidate.new_version.clone(),
            has_validation_changes: candidate.has_validation_changes,
            message_status: MessageStatus::NotSent,
            raw_xml: Some(candidate.raw_xml.clone()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO update_logs (
                id, template_id, old_version, new_version,
                has_validation_changes, message_status, raw_xml, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(&record.template_id)
        .bind(&record.old_version)
        .bind(&record.new_version)
        .bind(record.has_validation_changes as i32)
        .bind(record.message_status.as_str())
        .bind(&record.raw_xml)
        .bind(db_timestamp(record.created_at))
        .execute(&self.db_pool)
        .await
        .context("Error creando update_log")?;

        Ok(record)
    }

    /// Confirma la entrega: el registro pasa a SENT y la plantilla avanza a
    /// `new_version`, todo en una misma transacción.
    pub async fn mark_delivered(&self, record: &UpdateRecord) -> Result<()> {
        let now = db_timestamp(Utc::now());
        let mut tx = self
            .db_pool
            .begin()
            .await
            .context("No se pudo abrir transacción")?;

        sqlx::query(
            r#"
            UPDATE update_logs
            SET message_status = ?2
            WHERE id = ?1 AND message_status = ?3
            "#,
        )
        .bind(&record.id)
        .bind(MessageStatus::Sent.as_str())
        .bind(MessageStatus::NotSent.as_str())
        .execute(&mut *tx)
        .await
        .context("Error marcando update_log como SENT")?;

        sqlx::query(
            r#"
            UPDATE templates
            SET current_version = ?2,
                last_checked = ?3,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(&record.template_id)
        .bind(&record.new_version)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Error avanzando current_version")?;

        tx.commit().await.context("Error en commit de entrega")?;
        Ok(())
    }

    pub async fn get_record(&self, record_id: &str) -> Result<Option<UpdateRecord>> {
        let sql = format!(
            r#"
            SELECT {UPDATE_COLUMNS}
            FROM update_logs u
            JOIN templates t ON t.id = u.template_id
            WHERE u.id = ?1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(record_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("No se pudo consultar update_log")?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Historial de una plantilla, el más reciente primero
    pub async fn list_for_template(&self, template_id: &str) -> Result<Vec<UpdateRecord>> {
        let sql = format!(
            r#"
            SELECT {UPDATE_COLUMNS}
            FROM update_logs u
            JOIN templates t ON t.id = u.template_id
            WHERE u.template_id = ?1
            ORDER BY u.created_at DESC, u.rowid DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(template_id)
            .fetch_all(&self.db_pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Lista todos los cambios con paginación. Una página fuera de rango
    /// devuelve `items` vacío.
    pub async fn list_updates(&self, page: u64, page_size: u64) -> Result<ListUpdatesResponse> {
        let page = page.max(1);

        // total
        let total_row = sqlx::query("SELECT COUNT(*) AS cnt FROM update_logs")
            .fetch_one(&self.db_pool)
            .await?;
        let total: i64 = total_row.try_get("cnt")?;

        let window = (page - 1)
            .checked_mul(page_size)
            .and_then(|offset| Some((i64::try_from(page_size).ok()?, i64::try_from(offset).ok()?)));

        let items = match window {
            Some((limit, offset)) if offset < total => {
                let sql = format!(
                    r#"
                    SELECT {UPDATE_COLUMNS}
                    FROM update_logs u
                    JOIN templates t ON t.id = u.template_id
                    ORDER BY u.created_at DESC, u.rowid DESC
                    LIMIT ?1 OFFSET ?2
                    "#
                );
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.db_pool)
                    .await?;

                rows.iter()
                    .map(record_from_row)
                    .collect::<Result<Vec<_>>>()?
            }
            _ => Vec::new(),
        };

        Ok(ListUpdatesResponse {
            total: u64::try_from(total).unwrap_or_default(),
            page,
            page_size,
            items,
        })
    }
}

fn record_from_row(row: &SqliteRow) -> Result<UpdateRecord> {
    let has_validation_changes: i64 = row.try_get("has_validation_changes")?;
    let message_status: String = row.try_get("message_status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(UpdateRecord {
        id: row.try_get("id")?,
        template_id: row.try_get("template_id")?,
        template_code: row.try_get("template_code")?,
        old_version: row.try_get("old_version")?,
        new_version: row.try_get("new_version")?,
        has_validation_changes: has_validation_changes != 0,
        message_status: message_status.parse()?,
        raw_xml: row.try_get("raw_xml")?,
        created_at: created_at.parse::<DateTime<Utc>>()?,
    })
}
