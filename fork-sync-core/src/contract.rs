//! # contract: interface for publishing files to an object store
//!
//! This module defines a single trait ([`ObjectStore`]) and its supporting
//! types for pushing local files into a remote bucket via an API client,
//! a local system, or a mock/test implementation.
//!
//! ## Interface & Extensibility
//! - Implement the [`ObjectStore`] trait to create new storage clients
//!   (e.g. S3-compatible HTTP, file-based).
//! - The method is async and returns a boxed error type; implementors
//!   convert all meaningful upstream errors into it.
//! - Delivery semantics are at-least-once per file, idempotent on the
//!   destination key. A per-file failure must not abort the batch; the
//!   pipeline aggregates failures itself.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (see the
//!   `test-export-mocks` feature).

use async_trait::async_trait;
use std::path::Path;

use mockall::automock;

/// Error type for object-store operations (simple boxed error).
pub type UploadError = Box<dyn std::error::Error + Send + Sync>;

/// The data needed to store one file in the bucket.
pub struct PutRequest<'a> {
    /// Local path of the file in the working tree. Assumed to exist.
    pub local_path: &'a Path,
    /// Destination key in the bucket. Derived deterministically from the
    /// file's repo-relative path.
    pub key: &'a str,
}

/// Trait for publishing files to a remote bucket.
/// The implementor is responsible for connecting to a backing storage API.
///
/// The trait is implemented by real clients and by test mocks, and is
/// intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one file under its destination key. On success the file is
    /// retrievable at the key; on failure only this file is affected.
    async fn put_file<'a>(&self, req: PutRequest<'a>) -> Result<(), UploadError>;
}
