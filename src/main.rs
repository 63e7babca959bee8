use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::models::check_model::{CheckOptions, CheckSummary};
use crate::models::template_model::{
    CreateTemplateRequest, TemplateStatus, DEFAULT_INITIAL_VERSION,
};
use crate::models::update_model::{MessageStatus, UpdateRecord};
use crate::services::mattermost_service::MattermostService;
use crate::services::registry_service::RegistryService;
use crate::services::response_parser::parse_registry_response;
use crate::services::template_service::TemplateService;
use crate::services::update_checker::UpdateChecker;
use crate::services::update_log_service::UpdateLogService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "template_monitor")]
#[command(about = "Revisa versiones de plantillas en el registro y avisa a Mattermost")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Revisa actualizaciones de las plantillas activas
    Check {
        /// Revisar solo esta plantilla
        #[arg(long)]
        template_code: Option<String>,

        /// Detectar y registrar sin notificar ni avanzar versiones
        #[arg(long)]
        dry_run: bool,
    },

    /// Registra una plantilla para monitoreo
    AddTemplate {
        /// Código de la plantilla (p.ej. FORM.1.TSO.2026.ORG)
        template_code: String,

        #[arg(long, default_value = DEFAULT_INITIAL_VERSION)]
        version: String,

        #[arg(long, value_enum, default_value_t = TemplateStatus::Active)]
        status: TemplateStatus,
    },

    /// Envía una notificación de prueba a Mattermost
    TestNotify {
        #[arg(long, default_value = "TEST.TEMPLATE.001")]
        template_code: String,

        #[arg(long, default_value = "1.0.0")]
        old_version: String,

        #[arg(long, default_value = "1.0.1")]
        new_version: String,

        #[arg(long)]
        validation_changes: bool,
    },

    /// Consulta una plantilla en el registro y muestra lo parseado
    TestRegistry {
        template_code: String,

        #[arg(long, default_value = DEFAULT_INITIAL_VERSION)]
        version: String,

        /// Mostrar el XML completo
        #[arg(long)]
        show_xml: bool,
    },

    /// Levanta el API de administración
    Serve,
}

async fn setup_database(database_url: &str) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("DATABASE_URL inválida: {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Crear la carpeta del archivo (./data por defecto)
    if let Some(dir) = options.clone().get_filename().parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("No se pudo crear directorio {:?}", dir))?;
        }
    }

    log::info!("Conectando a SQLite en {}", database_url);

    let db_pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite.")?;

    TemplateService::new(db_pool.clone()).run_migrations().await?;
    Ok(db_pool)
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Check {
            template_code,
            dry_run,
        } => {
            run_check(
                &config,
                CheckOptions {
                    template_code,
                    dry_run,
                },
            )
            .await
        }
        Commands::AddTemplate {
            template_code,
            version,
            status,
        } => add_template(&config, template_code, version, status).await,
        Commands::TestNotify {
            template_code,
            old_version,
            new_version,
            validation_changes,
        } => {
            test_notify(
                &config,
                template_code,
                old_version,
                new_version,
                validation_changes,
            )
            .await
        }
        Commands::TestRegistry {
            template_code,
            version,
            show_xml,
        } => test_registry(&config, &template_code, &version, show_xml).await,
        Commands::Serve => serve(&config).await,
    }
}

async fn run_check(config: &AppConfig, options: CheckOptions) -> Result<()> {
    if config.registry_base_url.is_empty() {
        return Err(anyhow!("REGISTRY_API_BASE_URL no está configurada"));
    }

    let db_pool = setup_database(&config.database_url).await?;
    let checker = UpdateChecker::new(
        TemplateService::new(db_pool.clone()),
        UpdateLogService::new(db_pool.clone()),
        RegistryService::new(config)?,
        MattermostService::new(config)?,
    );

    // Los errores por plantilla no cambian el código de salida
    let summary = checker.run(&options).await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &CheckSummary) {
    println!("\n{}", "=".repeat(50));
    println!("¡Revisión terminada!");
    println!("Plantillas actualizadas: {}", summary.updated_count);
    println!("Errores: {}", summary.error_count);
    println!("Total revisadas: {}", summary.checked);
    if summary.dry_run {
        println!("Corrida en modo DRY RUN - no se enviaron notificaciones");
    }
}

async fn add_template(
    config: &AppConfig,
    template_code: String,
    version: String,
    status: TemplateStatus,
) -> Result<()> {
    let db_pool = setup_database(&config.database_url).await?;
    let template_service = TemplateService::new(db_pool);

    if template_service.get_template(&template_code).await?.is_some() {
        println!("La plantilla {} ya existe en la base de datos", template_code);
        return Ok(());
    }

    let template = template_service
        .create_template(CreateTemplateRequest {
            template_code,
            current_version: Some(version),
            status: Some(status),
        })
        .await?;

    println!("Plantilla registrada:");
    println!("ID: {}", template.id);
    println!("Código: {}", template.template_code);
    println!("Versión: {}", template.current_version);
    println!("Estado: {}", template.status);
    println!("Creada: {}", template.created_at);
    Ok(())
}

async fn test_notify(
    config: &AppConfig,
    template_code: String,
    old_version: String,
    new_version: String,
    has_validation_changes: bool,
) -> Result<()> {
    let mattermost = MattermostService::new(config)?;

    let Some(webhook_url) = mattermost.webhook_url() else {
        println!("¡Webhook URL de Mattermost no configurado!");
        println!("Defina MATTERMOST_WEBHOOK_URL en el entorno o en .env");
        return Ok(());
    };
    if mattermost.channel().is_none() {
        println!("Canal de Mattermost no configurado (MATTERMOST_CHANNEL); se usa el del webhook");
    }

    println!("Plantilla: {}", template_code);
    println!("Versión: {} → {}", old_version, new_version);
    println!("Cambios en validaciones: {}", has_validation_changes);
    println!("Webhook URL: {}", webhook_url);
    println!("Canal: {}", mattermost.channel().unwrap_or("-"));

    // Registro de prueba, no se guarda en la base
    let record = UpdateRecord {
        id: "test".to_string(),
        template_id: "test".to_string(),
        template_code,
        old_version,
        new_version,
        has_validation_changes,
        message_status: MessageStatus::NotSent,
        raw_xml: None,
        created_at: Utc::now(),
    };

    if mattermost.send_update_notification(&record).await {
        println!("¡Notificación de prueba enviada!");
    } else {
        println!("Error enviando la notificación de prueba; revise la configuración y los logs");
    }
    Ok(())
}

async fn test_registry(
    config: &AppConfig,
    template_code: &str,
    version: &str,
    show_xml: bool,
) -> Result<()> {
    if config.registry_base_url.is_empty() {
        return Err(anyhow!("REGISTRY_API_BASE_URL no está configurada"));
    }
    let registry = RegistryService::new(config)?;

    println!("Consultando registro para {} (versión {})", template_code, version);
    let raw_xml = match registry.fetch_template(template_code, version).await {
        Ok(raw) => raw,
        Err(e) => {
            println!("No se pudieron obtener datos del registro: {}", e);
            return Ok(());
        }
    };

    match parse_registry_response(&raw_xml, template_code) {
        Ok(candidate) => {
            println!("Código: {}", candidate.template_code);
            println!("Última versión: {}", candidate.new_version);
            println!("Descripción: {}", candidate.description);
            println!("Cambios en validaciones: {}", candidate.has_validation_changes);
        }
        Err(e) => println!("Respuesta no utilizable: {}", e),
    }

    if show_xml {
        println!("\n{}\nXML\n{}", "=".repeat(50), "=".repeat(50));
        println!("{}", raw_xml);
    }
    Ok(())
}

async fn serve(config: &AppConfig) -> Result<()> {
    let db_pool = setup_database(&config.database_url).await?;
    let template_service = TemplateService::new(db_pool.clone());
    let update_log_service = UpdateLogService::new(db_pool.clone());

    log::info!(
        "Levantando servidor en {}:{}",
        config.server_host,
        config.server_port
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(template_service.clone()))
            .app_data(web::Data::new(update_log_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;
    Ok(())
}
