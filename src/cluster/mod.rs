//! Hierarchical point clustering across zoom levels.
//!
//! [`ClusterIndexBuilder`] merges points bottom-up, from `max_zoom` down to
//! `min_zoom`, keeping one R-tree per zoom. [`ClusterIndex`] answers viewport
//! queries against those trees and navigates the merge hierarchy.

mod builder;
mod index;
mod record;

pub use builder::ClusterIndexBuilder;
pub use index::ClusterIndex;
pub use record::{ClusterId, ClusterRecord};
