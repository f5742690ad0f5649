//! The signer registry and metadata loader (`spec.md` §4.1, "Metadata
//! loader" and "Signer registry").
//!
//! `loader`/`metadata` turn on-disk YAML definitions and bulk cloud-vault
//! listings into concrete [`signing_method::Signer`]s; `registry` is the
//! process-wide, concurrently-mutated map those signers live in once
//! loaded.

pub mod bulk;
mod loader;
mod metadata;
mod registry;

pub use bulk::{load_bulk_source, BulkLoadError, BulkLoadStatus, BulkSecret, BulkSecretSource};
pub use loader::{build_signer, load_directory, LoadError, MappedResults};
pub use metadata::{parse_metadata_file, write_metadata_file, MetadataError, SigningDefinition};
pub use registry::{LoadSummary, LoadSupplier, SignerRegistry};
