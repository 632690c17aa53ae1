//! Satchel - BagIt packaging and profile validation engine
//!
//! This library builds BagIt bags (RFC 8493) from arbitrary source files and
//! validates existing bags, as directory trees or tar archives, against
//! declarative BagIt profiles.

pub mod bagfile;
pub mod bagger;
pub mod config;
pub mod digest;
pub mod errors;
pub mod events;
pub mod kv;
pub mod manifest;
pub mod parse;
pub mod profile;
pub mod repo;
pub mod serialization;
pub mod standard;
pub mod tagfile;
pub mod validator;

pub use bagfile::{BagItFile, FileRole};
pub use bagger::{BagOutcome, BagSource, Bagger, choose_algorithms};
pub use config::{CancelToken, EngineConfig};
pub use self::digest::{Algorithm, Hasher, HasherSet};
pub use errors::{BagError, ErrorKind, ValidationError};
pub use events::{BagObserver, LogObserver, NoopObserver, TaskEvent, TaskKind};
pub use kv::KeyValueCollection;
pub use profile::{Profile, ProfileInfo, Serialization, TagDefinition, BAGIT_TXT, BAG_INFO_TXT};
pub use repo::{MemoryRepository, RepoError, Repository};
pub use validator::{ValidationReport, Validator};
