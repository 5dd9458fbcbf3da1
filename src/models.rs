pub mod catalog;
pub mod discount;
pub mod search;
pub mod tenancy;
