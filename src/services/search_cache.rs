// src/services/search_cache.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{models::search::SearchResponse, services::query_builder::NormalizedQuery};

/// Chave canônica: a consulta normalizada (conjuntos ordenados) + o balde de
/// tempo. Virar o balde equivale a expirar a entrada.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: NormalizedQuery,
    pub bucket: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: SearchResponse,
    created_at: DateTime<Utc>,
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    // tick de uso -> chave; o primeiro é o menos recente
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_used);
            self.evictions += 1;
        }
    }
}

/// LRU limitado com expiração por balde de tempo. O lock só cobre as operações
/// no mapa; nada de await com ele na mão.
pub struct SearchCache {
    inner: Mutex<Inner>,
    capacity: usize,
    window_secs: i64,
}

impl SearchCache {
    pub fn new(capacity: usize, window_secs: u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            window_secs: window_secs.max(1) as i64,
        }
    }

    pub fn bucket_for(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.window_secs)
    }

    pub fn key_for(&self, query: &NormalizedQuery, now: DateTime<Utc>) -> CacheKey {
        CacheKey {
            query: query.clone(),
            bucket: self.bucket_for(now),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<SearchResponse> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();

        let Some(entry) = inner.entries.get_mut(key) else {
            inner.misses += 1;
            return None;
        };
        let previous = std::mem::replace(&mut entry.last_used, tick);
        let response = entry.response.clone();
        tracing::debug!(
            bucket = key.bucket,
            created_at = %entry.created_at,
            "cache hit"
        );

        inner.recency.remove(&previous);
        inner.recency.insert(tick, key.clone());
        inner.hits += 1;
        Some(response)
    }

    pub fn insert(&self, key: CacheKey, response: SearchResponse, now: DateTime<Utc>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();

        if let Some(old) = inner.entries.remove(&key) {
            inner.recency.remove(&old.last_used);
        }

        if inner.entries.len() >= self.capacity {
            // 1. Baldes que já passaram não servem para mais nada
            let stale: Vec<CacheKey> = inner
                .entries
                .keys()
                .filter(|k| k.bucket < key.bucket)
                .cloned()
                .collect();
            for k in &stale {
                inner.remove(k);
            }
            // 2. Ainda cheio: sai o menos usado
            while inner.entries.len() >= self.capacity {
                let Some((_, lru)) = inner.recency.pop_first() else {
                    break;
                };
                inner.entries.remove(&lru);
                inner.evictions += 1;
            }
        }

        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                response,
                created_at: now,
                last_used: tick,
            },
        );
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
        tracing::info!("🧹 Cache de busca limpo");
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}
