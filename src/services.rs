pub mod analytics;
pub mod catalog_join;
pub mod post_filter;
pub mod pricing;
pub mod query_builder;
pub mod ranking;
pub mod search_cache;
pub mod search_service;
