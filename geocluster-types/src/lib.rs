//! # geocluster-types
//!
//! Core data types shared by the geocluster index cache and its loaders.
//!
//! - **Record types**: `GeoPoint`, `AttributeValue`
//! - **Viewport types**: `BoundingBox`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geocluster_types::point::{AttributeValue, GeoPoint};
//!
//! let nairobi = GeoPoint::new("learner-1", 36.8219, -1.2921)
//!     .with_attribute("gender", AttributeValue::from("female"))
//!     .with_attribute("is_graduate", AttributeValue::from(true));
//! assert_eq!(nairobi.longitude(), 36.8219);
//! ```

pub mod bbox;
pub mod point;
