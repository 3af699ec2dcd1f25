//! CLI Commands

pub mod identity;
pub mod peer;
