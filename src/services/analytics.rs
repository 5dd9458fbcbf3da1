// src/services/analytics.rs

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;

// Textos distintos guardados para o ranking de populares
pub const MAX_TRACKED_TEXTS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_searches: u64,
    pub cache_hits: u64,
    pub zero_result_searches: u64,
    pub failed_searches: u64,
    pub average_time_ms: f64,
    pub popular_queries: Vec<PopularQuery>,
}

// Um registro por chamada de `search`.
#[derive(Debug, Clone, Copy)]
pub struct SearchEvent<'a> {
    pub text: Option<&'a str>,
    pub results: usize,
    pub elapsed_ms: u64,
    pub from_cache: bool,
    pub failed: bool,
}

#[derive(Default)]
struct Counters {
    total: u64,
    cache_hits: u64,
    zero_results: u64,
    failed: u64,
    total_time_ms: u64,
    by_text: HashMap<String, u64>,
}

/// Contador compartilhado das buscas. Alimenta o `/api/search/stats`.
pub struct SearchAnalytics {
    counters: Mutex<Counters>,
    max_texts: usize,
}

impl Default for SearchAnalytics {
    fn default() -> Self {
        Self::with_text_limit(MAX_TRACKED_TEXTS)
    }
}

impl SearchAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_limit(max_texts: usize) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            max_texts: max_texts.max(1),
        }
    }

    pub fn record(&self, event: SearchEvent<'_>) {
        let mut c = self.counters.lock();
        c.total += 1;
        c.total_time_ms = c.total_time_ms.saturating_add(event.elapsed_ms);
        if event.from_cache {
            c.cache_hits += 1;
        }
        if event.failed {
            c.failed += 1;
        } else if event.results == 0 {
            c.zero_results += 1;
        }
        if let Some(text) = event.text.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
            if !c.by_text.contains_key(&text) && c.by_text.len() >= self.max_texts {
                // Cheio: sai o texto menos buscado (empate: o maior em ordem alfabética)
                let coldest = c
                    .by_text
                    .iter()
                    .min_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(text, _)| text.clone());
                if let Some(coldest) = coldest {
                    c.by_text.remove(&coldest);
                }
            }
            *c.by_text.entry(text).or_insert(0) += 1;
        }
    }

    /// Textos mais buscados (contagem desc, depois texto asc).
    pub fn popular(&self, limit: usize) -> Vec<PopularQuery> {
        let c = self.counters.lock();
        let mut all: Vec<PopularQuery> = c
            .by_text
            .iter()
            .map(|(query, count)| PopularQuery {
                query: query.clone(),
                count: *count,
            })
            .collect();
        drop(c);

        all.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        all.truncate(limit);
        all
    }

    pub fn snapshot(&self, popular_limit: usize) -> AnalyticsSnapshot {
        let mut snapshot = {
            let c = self.counters.lock();
            AnalyticsSnapshot {
                total_searches: c.total,
                cache_hits: c.cache_hits,
                zero_result_searches: c.zero_results,
                failed_searches: c.failed,
                average_time_ms: if c.total == 0 {
                    0.0
                } else {
                    c.total_time_ms as f64 / c.total as f64
                },
                popular_queries: Vec::new(),
            }
        };
        snapshot.popular_queries = self.popular(popular_limit);
        snapshot
    }

    pub fn clear(&self) {
        *self.counters.lock() = Counters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn event(text: Option<&str>, results: usize) -> SearchEvent<'_> {
        SearchEvent {
            text,
            results,
            elapsed_ms: 10,
            from_cache: false,
            failed: false,
        }
    }

    #[test]
    fn counts_and_ranks_queries() {
        let analytics = SearchAnalytics::new();
        analytics.record(event(Some("Gin"), 3));
        analytics.record(event(Some(" gin "), 2));
        analytics.record(event(Some("rum"), 0));
        analytics.record(event(None, 8));
        analytics.record(SearchEvent {
            from_cache: true,
            ..event(Some("vodka"), 1)
        });

        let snap = analytics.snapshot(10);
        assert_eq!(snap.total_searches, 5);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.zero_result_searches, 1);
        assert_eq!(snap.average_time_ms, 10.0);
        assert_eq!(
            analytics.popular(2),
            vec![
                PopularQuery { query: "gin".into(), count: 2 },
                PopularQuery { query: "rum".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn failures_are_not_zero_result_searches() {
        let analytics = SearchAnalytics::new();
        analytics.record(SearchEvent {
            failed: true,
            ..event(Some("gin"), 0)
        });
        let snap = analytics.snapshot(5);
        assert_eq!(snap.failed_searches, 1);
        assert_eq!(snap.zero_result_searches, 0);
    }

    #[test]
    fn clear_resets_everything() {
        let analytics = SearchAnalytics::new();
        analytics.record(event(Some("gin"), 1));
        analytics.clear();
        assert_eq!(analytics.snapshot(5), AnalyticsSnapshot::default());
    }

    #[test]
    fn distinct_texts_are_bounded_and_hot_ones_survive() {
        let analytics = SearchAnalytics::with_text_limit(3);
        for _ in 0..5 {
            analytics.record(event(Some("gin"), 1));
        }
        for i in 0..100 {
            analytics.record(event(Some(&format!("texto {i}")), 1));
        }

        let popular = analytics.popular(usize::MAX);
        assert_eq!(popular.len(), 3);
        assert_eq!(popular[0], PopularQuery { query: "gin".into(), count: 5 });
        assert_eq!(analytics.snapshot(1).total_searches, 105);
    }

    #[tokio::test]
    async fn concurrent_records_are_not_lost() {
        let analytics = Arc::new(SearchAnalytics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let analytics = analytics.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    analytics.record(event(Some("cerveja"), 1));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(analytics.snapshot(1).total_searches, 800);
        assert_eq!(analytics.popular(1)[0].count, 800);
    }
}
