//! Application layer: the relay use case.
//!
//! Depends only on trait seams and domain types; infrastructure
//! implementations are injected at construction time.

pub mod relay;
