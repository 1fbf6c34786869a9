//! notionify-core - Core library for Notionify
//!
//! This crate keeps a cloud-storage folder mirrored as records in an external
//! database. It contains the mapping store, the in-flight guard, the folder
//! diff source and the record sync engine, plus the production collaborators
//! (Dropbox and Notion clients) they are wired to.

pub mod database;
pub mod diff;
pub mod engine;
pub mod error;
pub mod folder;
pub mod guard;
mod http;
pub mod models;
pub mod pdf;
pub mod reverse;
pub mod storage;
pub mod store;

pub use database::RecordDatabase;
pub use diff::FolderDiffSource;
pub use engine::RecordSyncEngine;
pub use error::{BatchFailure, CollaboratorError, Error, Result, StoreError};
pub use folder::{FolderSyncOutcome, FolderSynchronizer};
pub use guard::{AlreadyInProgress, InFlightGuard, InFlightPermit};
pub use models::{CloudRecord, Entry, ExternalRecord, FileMetadata, Fingerprint};
pub use reverse::DatabaseSyncer;
pub use storage::CloudStorage;
pub use store::MappingStore;
