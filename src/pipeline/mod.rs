//! Regional aggregation pipeline.
//!
//! Turns source rows into a canonical "value per region" table, either by
//! averaging regional surveillance rates or by apportioning a national
//! figure with demographic weights, then derives the summary figures shown
//! next to the map.

pub mod aggregate;
pub mod apportion;
pub mod summary;
pub mod types;
pub mod utility;
pub mod view;
