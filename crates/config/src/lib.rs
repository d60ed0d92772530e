//! # Rekit Config
//!
//! Layered configuration for rebuild runs, loaded with `figment`. Later
//! layers override earlier ones:
//!
//! 1. built-in defaults;
//! 2. `config.toml` in the platform configuration directory;
//! 3. an explicitly named file (TOML, YAML or JSON, chosen by extension);
//! 4. `REKIT_` environment variables, with `__` separating nested keys
//!    (`REKIT_REBUILD__INPUT_DEPOT__DEPTH=2`).
//!
//! [`Config::rebuild_options`] validates the result into
//! [`RebuildOptions`](rekit_rebuild::RebuildOptions).

pub mod error;
mod loader;
mod model;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::loader::ENV_PREFIX;
pub use crate::model::{Config, InputDepotSection, MAX_DEPOT_DEPTH, OutputDepotSection, RebuildSection, TreatAsFileSection};
