// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{AiConfigRepository, MockTicketSource, PgTicketRepository, TicketSource},
    services::{
        chat_service::ChatService, dashboard_service::DashboardService, responder::CannedResponder,
    },
};

// Lê uma variável numérica; ausente = valor padrão, inválida = erro na partida.
fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    // `None` = entradas sem TTL explícito nunca expiram.
    pub cache_default_ttl: Option<Duration>,
    pub cache_cleanup_interval: Duration,
    pub chat_response_timeout: Duration,
    pub chat_simulated_latency: Duration,
    pub ai_config_path: PathBuf,
    pub mock_ticket_count: usize,
    pub mock_seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            cache_default_ttl: Some(Duration::from_secs(5 * 60)),
            cache_cleanup_interval: Duration::from_secs(60),
            chat_response_timeout: Duration::from_secs(30),
            chat_simulated_latency: Duration::from_millis(800),
            ai_config_path: PathBuf::from("ai_config.json"),
            mock_ticket_count: 500,
            mock_seed: 42,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let cache_ttl_secs: u64 = env_or("CACHE_DEFAULT_TTL_SECS", 5 * 60)?;
        let cleanup_secs: u64 = env_or("CACHE_CLEANUP_INTERVAL_SECS", 60)?;
        if cleanup_secs == 0 {
            anyhow::bail!("CACHE_CLEANUP_INTERVAL_SECS deve ser maior que zero");
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            cache_default_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
            cache_cleanup_interval: Duration::from_secs(cleanup_secs),
            chat_response_timeout: Duration::from_secs(env_or("CHAT_RESPONSE_TIMEOUT_SECS", 30)?),
            chat_simulated_latency: Duration::from_millis(env_or("CHAT_SIMULATED_LATENCY_MS", 800)?),
            ai_config_path: env::var("AI_CONFIG_PATH").map(PathBuf::from).unwrap_or(defaults.ai_config_path),
            mock_ticket_count: env_or("MOCK_TICKET_COUNT", defaults.mock_ticket_count)?,
            mock_seed: env_or("MOCK_SEED", defaults.mock_seed)?,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub chat_service: ChatService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        // --- Fonte das comandas ---
        let source: Arc<dyn TicketSource> = match &config.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!().run(&db_pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgTicketRepository::new(db_pool))
            }
            None => {
                tracing::info!(
                    "🎲 DATABASE_URL não definida: usando {} comandas simuladas (seed {})",
                    config.mock_ticket_count,
                    config.mock_seed
                );
                Arc::new(MockTicketSource::new(config.mock_ticket_count, config.mock_seed))
            }
        };

        // --- Monta o gráfico de dependências ---
        let dashboard_service = DashboardService::with_default_cache(source, config.cache_default_ttl);

        let responder = Arc::new(CannedResponder::new(config.chat_simulated_latency));
        let config_repo = AiConfigRepository::new(config.ai_config_path.clone());
        let chat_service = ChatService::new(responder, config_repo, config.chat_response_timeout);
        chat_service.load_config().await?;
        if !chat_service.is_configured() {
            tracing::info!("🤖 Assistente de IA ainda não configurado (PUT /api/chat/config)");
        }

        Ok(Self {
            dashboard_service,
            chat_service,
        })
    }
}
