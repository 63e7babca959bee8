use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::{
    models::template_model::{
        CreateTemplateRequest, TemplateRecord, TemplateStatus, DEFAULT_INITIAL_VERSION,
    },
    services::db_timestamp,
};

const TEMPLATE_COLUMNS: &str = r#"
    id, template_code, current_version, status,
    last_checked, created_at, updated_at
"#;

#[derive(Clone, Debug)]
pub struct TemplateService {
    db_pool: Pool<Sqlite>,
}

impl TemplateService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        TemplateService { db_pool }
    }

    /// Corre migraciones con sqlx (templates + update_logs)
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Fallo en migraciones de 'templates'")?;
        Ok(())
    }

    /// Registra una plantilla. El código es único: un duplicado falla
    /// por la restricción UNIQUE.
    pub async fn create_template(&self, req: CreateTemplateRequest) -> Result<TemplateRecord> {
        let id = Uuid::new_v4().to_string();
        let now = db_timestamp(Utc::now());
        let version = req
            .current_version
            .unwrap_or_else(|| DEFAULT_INITIAL_VERSION.to_string());
        let status = req.status.unwrap_or(TemplateStatus::Active);

        sqlx::query(
            r#"
            INSERT INTO templates (
                id, template_code, current_version, status,
                last_checked, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(&req.template_code)
        .bind(&version)
        .bind(status.as_str())
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .with_context(|| format!("Fallo al insertar plantilla {}", req.template_code))?;

        log::info!(
            "(create_template) Plantilla {} registrada con versión {} y estado {}",
            req.template_code,
            version,
            status
        );

        self.get_template(&req.template_code)
            .await?
            .context("La plantilla recién creada no se encontró")
    }

    pub async fn get_template(&self, template_code: &str) -> Result<Option<TemplateRecord>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_code = ?1");
        let row = sqlx::query(&sql)
            .bind(template_code)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al consultar plantilla")?;

        row.as_ref().map(template_from_row).transpose()
    }

    /// Lista plantillas ordenadas por código, opcionalmente por estado
    pub async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> Result<Vec<TemplateRecord>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE status = ?1 ORDER BY template_code"
                );
                sqlx::query(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.db_pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY template_code");
                sqlx::query(&sql).fetch_all(&self.db_pool).await?
            }
        };

        rows.iter().map(template_from_row).collect()
    }

    /// Plantillas que entran en una corrida de `check`
    pub async fn list_active(&self, template_code: Option<&str>) -> Result<Vec<TemplateRecord>> {
        let templates = self.list_templates(Some(TemplateStatus::Active)).await?;
        Ok(match template_code {
            Some(code) => templates
                .into_iter()
                .filter(|t| t.template_code == code)
                .collect(),
            None => templates,
        })
    }

    /// Devuelve false si la plantilla no existe
    pub async fn set_status(&self, template_code: &str, status: TemplateStatus) -> Result<bool> {
        let now = db_timestamp(Utc::now());
        let res = sqlx::query(
            r#"
            UPDATE templates
            SET status = ?2,
                updated_at = ?3
            WHERE template_code = ?1
            "#,
        )
        .bind(template_code)
        .bind(status.as_str())
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar estado de plantilla")?;

        Ok(res.rows_affected() > 0)
    }

    pub async fn touch_last_checked(&self, template_id: &str) -> Result<()> {
        let now = db_timestamp(Utc::now());
        sqlx::query(
            r#"
            UPDATE templates
            SET last_checked = ?2,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(template_id)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar last_checked")?;

        Ok(())
    }

    /// Borra la plantilla; sus update_logs caen en cascada
    pub async fn delete_template(&self, template_code: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM templates WHERE template_code = ?1")
            .bind(template_code)
            .execute(&self.db_pool)
            .await
            .context("Fallo al borrar plantilla")?;

        Ok(res.rows_affected() > 0)
    }
}

fn template_from_row(row: &SqliteRow) -> Result<TemplateRecord> {
    let status: String = row.try_get("status")?;
    let last_checked: String = row.try_get("last_checked")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(TemplateRecord {
        id: row.try_get("id")?,
        template_code: row.try_get("template_code")?,
        current_version: row.try_get("current_version")?,
        status: status.parse()?,
        last_checked: last_checked.parse()?,
        created_at: created_at.parse()?,
        updated_at: updated_at.parse()?,
    })
}
