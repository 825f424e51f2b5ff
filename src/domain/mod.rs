//! Domain layer types.

pub mod entities;
