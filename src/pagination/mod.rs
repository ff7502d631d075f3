//! Pagination module
//!
//! Supports: value-cursor paging over an ordered field, and a single
//! unbounded fetch for collections with no ordering field configured.
//!
//! # Overview
//!
//! - `resolve_pagination_field` - picks the ordering field for a collection
//! - `walk_collection` - pages through a collection using "after last value"
//! - `fetch_all` - one unordered query for the whole collection

mod resolver;
mod walker;

pub use resolver::resolve_pagination_field;
pub use walker::{fetch_all, walk_collection, PagePosition};

#[cfg(test)]
mod tests;
