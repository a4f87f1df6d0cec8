//! Photo library triage: score photos for quality in resumable batches,
//! cache the results, and bulk-delete the bad ones.

pub mod cache;
pub mod collection;
pub mod config;
pub mod engine;
pub mod library;
pub mod logging;
pub mod photo;
pub mod scorer;
pub mod selection;
pub mod session;
pub mod storage;
pub mod trash;

#[cfg(test)]
pub(crate) mod test_support;
