pub mod catalog_repo;
pub use catalog_repo::{CatalogRepository, CatalogStore};
pub mod reference_repo;
pub use reference_repo::{ReferenceRepository, ReferenceResolver};

#[cfg(test)]
pub mod memory_repo;
