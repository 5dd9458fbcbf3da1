// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, ReferenceRepository},
    services::{
        analytics::SearchAnalytics, post_filter::PriceRangeMode, search_cache::SearchCache,
        search_service::SearchService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

// ---
// Parâmetros da busca (variáveis SEARCH_*)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SearchSettings {
    #[validate(range(min = 1, max = 100000, message = "SEARCH_CACHE_CAPACITY deve estar entre 1 e 100000."))]
    pub cache_capacity: usize,

    #[validate(range(min = 1, max = 86400, message = "SEARCH_CACHE_WINDOW_SECS deve estar entre 1 e 86400."))]
    pub cache_window_secs: u64,

    #[validate(range(min = 10, max = 60000, message = "SEARCH_DB_TIMEOUT_MS deve estar entre 10 e 60000."))]
    pub db_timeout_ms: u64,

    // Teto de itens trazidos do catálogo antes do JOIN
    #[validate(range(min = 1, max = 10000, message = "SEARCH_MAX_RESULTS deve estar entre 1 e 10000."))]
    pub max_results: i64,

    // overlap (padrão) | contained
    pub price_range_mode: PriceRangeMode,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            cache_window_secs: 60,
            db_timeout_ms: 2000,
            max_results: 500,
            price_range_mode: PriceRangeMode::Overlap,
        }
    }
}

impl SearchSettings {
    pub fn db_timeout(&self) -> Duration {
        Duration::from_millis(self.db_timeout_ms)
    }

    /// Lê as variáveis de ambiente (ausente = padrão) e valida.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            cache_capacity: parse_var(&lookup, "SEARCH_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_window_secs: parse_var(&lookup, "SEARCH_CACHE_WINDOW_SECS", defaults.cache_window_secs)?,
            db_timeout_ms: parse_var(&lookup, "SEARCH_DB_TIMEOUT_MS", defaults.db_timeout_ms)?,
            max_results: parse_var(&lookup, "SEARCH_MAX_RESULTS", defaults.max_results)?,
            price_range_mode: parse_var(&lookup, "SEARCH_PRICE_RANGE_MODE", defaults.price_range_mode)?,
        };
        settings.validate().map_err(AppError::from)?;
        Ok(settings)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{name} inválida: '{raw}' ({e})")),
        None => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bind_addr: String,
    pub search_service: SearchService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let settings = SearchSettings::from_env()?;
        tracing::info!(?settings, "⚙️ Configuração da busca carregada");

        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let catalog_repo = Arc::new(CatalogRepository::new(db_pool.clone()));
        let reference_repo = Arc::new(ReferenceRepository::new(db_pool.clone()));
        let cache = Arc::new(SearchCache::new(
            settings.cache_capacity,
            settings.cache_window_secs,
        ));
        let analytics = Arc::new(SearchAnalytics::new());
        let search_service =
            SearchService::new(catalog_repo, reference_repo, cache, analytics, settings);

        Ok(Self {
            db_pool,
            bind_addr,
            search_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        let settings = SearchSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, SearchSettings::default());
        assert_eq!(settings.db_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn variables_override_defaults() {
        let settings = SearchSettings::from_lookup(lookup(&[
            ("SEARCH_CACHE_CAPACITY", "50"),
            ("SEARCH_DB_TIMEOUT_MS", " 750 "),
        ]))
        .unwrap();
        assert_eq!(settings.cache_capacity, 50);
        assert_eq!(settings.db_timeout_ms, 750);
        assert_eq!(settings.max_results, 500);
        assert_eq!(settings.price_range_mode, PriceRangeMode::Overlap);

        let strict = SearchSettings::from_lookup(lookup(&[("SEARCH_PRICE_RANGE_MODE", "Contained")])).unwrap();
        assert_eq!(strict.price_range_mode, PriceRangeMode::Contained);
    }

    #[test]
    fn garbage_and_out_of_range_values_are_rejected() {
        assert!(SearchSettings::from_lookup(lookup(&[("SEARCH_MAX_RESULTS", "muitos")])).is_err());
        assert!(SearchSettings::from_lookup(lookup(&[("SEARCH_CACHE_CAPACITY", "0")])).is_err());
        assert!(SearchSettings::from_lookup(lookup(&[("SEARCH_DB_TIMEOUT_MS", "1")])).is_err());
        assert!(SearchSettings::from_lookup(lookup(&[("SEARCH_PRICE_RANGE_MODE", "inside")])).is_err());
    }
}
