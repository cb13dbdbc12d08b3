//! API handlers

pub mod collection;
pub mod health;
pub mod search;
