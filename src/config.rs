// src/config.rs

use crate::db::{ImportStore, InMemoryStore, PgImportStore};
use crate::services::import_service::ImportService;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

/// Limites do pipeline de importação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    // Registros por lote de escrita
    pub chunk_size: usize,
    // E-mails por consulta de clientes existentes
    pub lookup_batch_size: usize,
    // Linhas devolvidas na pré-visualização
    pub preview_rows: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            lookup_batch_size: 200,
            preview_rows: 10,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Valor inválido em {}: '{}'. Usando o padrão.", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

impl ImportSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_or("IMPORT_CHUNK_SIZE", defaults.chunk_size).max(1),
            lookup_batch_size: env_or("IMPORT_LOOKUP_BATCH_SIZE", defaults.lookup_batch_size).max(1),
            preview_rows: env_or("IMPORT_PREVIEW_ROWS", defaults.preview_rows),
        }
    }
}

/// Backend escolhido por IMPORT_STORE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    pub fn from_env() -> Self {
        match env::var("IMPORT_STORE").as_deref().map(str::trim) {
            Ok("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    // None quando rodando com o store em memória
    pub db_pool: Option<PgPool>,
    pub import_service: ImportService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = ImportSettings::from_env();

        if StoreKind::from_env() == StoreKind::Memory {
            tracing::warn!("⚠️ IMPORT_STORE=memory: os dados não serão persistidos");
            return Ok(Self::with_store(Arc::new(InMemoryStore::new()), settings));
        }

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;

        let db_pool = PgPoolOptions::new()
            .max_connections(env_or("DB_MAX_CONNECTIONS", 5))
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let store = PgImportStore::new(db_pool.clone());
        let import_service = ImportService::new(Arc::new(store), settings);

        Ok(Self {
            db_pool: Some(db_pool),
            import_service,
        })
    }

    /// Estado montado sobre um store já pronto (testes e modo em memória).
    pub fn with_store(store: Arc<dyn ImportStore>, settings: ImportSettings) -> Self {
        Self {
            db_pool: None,
            import_service: ImportService::new(store, settings),
        }
    }
}
