#![doc = "fork-sync-core: core logic library for fork-sync."]

//! This crate contains all pipeline logic and data models for fork-sync:
//! the git plumbing, the change detector, the object-store contract and the
//! synchronisation pipeline. The concrete network client lives in the CLI
//! crate.
//!
//! # Usage
//! Add this as a dependency for all shared pipeline, git, config and sync
//! code.

pub mod config;
pub mod contract;
pub mod error;
pub mod git;
pub mod synchronise;
