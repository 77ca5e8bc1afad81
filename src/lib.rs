//! Library crate for bingo-arena, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Request payloads and derived views.
pub mod dto;
/// Service-level error taxonomy.
pub mod error;
/// Orchestration of lobby, gameplay, and session flows.
pub mod services;
/// Domain state and the room machine.
pub mod state;
/// Sync backend boundary and implementations.
pub mod sync;
