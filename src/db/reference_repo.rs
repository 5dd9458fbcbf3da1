// src/db/reference_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::catalog::ReferenceKind};

/// Traduz nomes legíveis ("Vinho Tinto", "jack-daniels") para IDs estáveis.
/// O cadastro dessas referências pertence a outro serviço; aqui só lemos.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(&self, kind: ReferenceKind, name: &str) -> Result<Option<Uuid>, AppError>;
}

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceResolver for ReferenceRepository {
    async fn resolve(&self, kind: ReferenceKind, name: &str) -> Result<Option<Uuid>, AppError> {
        // O nome da tabela vem de um enum fechado, nunca do usuário.
        let sql = format!(
            "SELECT id FROM {} WHERE lower(name) = lower($1) OR slug = lower($1) LIMIT 1",
            kind.table()
        );

        let id = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }
}
