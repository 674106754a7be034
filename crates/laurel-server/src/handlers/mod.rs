//! Route handlers, grouped by who calls them.

pub mod achievements;
pub mod review;
