//! LARDER Core - Entity Types
//!
//! Data structures, error taxonomy, and configuration shared by every other
//! crate in the workspace. No I/O lives here.

pub mod config;
pub mod entities;
pub mod error;
pub mod fetch;
pub mod identity;

pub use config::{BackendKind, CacheSettings, CodecKind, LarderConfig, DEFAULT_REGION, ITEM_REGION};
pub use entities::{Item, ItemDraft};
pub use error::{CacheError, CodecError, ConfigError, LarderError, LarderResult, StorageError};
pub use fetch::{FetchResult, Provenance};
pub use identity::ItemId;
