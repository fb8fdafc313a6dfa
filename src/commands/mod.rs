//! Command implementations

pub mod prebuild;
