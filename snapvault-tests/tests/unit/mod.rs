//! Unit tests for snapvault
//!
//! These tests drive the backup pipeline through its mock seams: the
//! in-memory object store, the filesystem-backed snapshot provider, and
//! the scripted command executor.

mod backup;
mod config;
mod orchestrator;
mod upload;
