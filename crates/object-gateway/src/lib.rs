//! Get/put access to object storage with user metadata.
//!
//! The pipeline only needs two operations on its store: read an object
//! together with its metadata, and write one (overwriting). [`ObjectGateway`]
//! captures exactly that, with two implementations:
//!
//! - [`InMemoryGateway`] - a shared in-process map for tests and local runs
//! - `S3Gateway` - Amazon S3, behind the `s3` feature (enabled by default)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod gateway;
mod memory;
mod record;
#[cfg(feature = "s3")]
mod s3;

pub use error::{BoxError, Result, StorageError};
pub use gateway::ObjectGateway;
pub use memory::InMemoryGateway;
pub use record::ObjectRecord;
#[cfg(feature = "s3")]
pub use s3::S3Gateway;
