//! pf-core: shared foundation for pvflow.
//!
//! Contains:
//! - table (labeled CSV config tables as used under `csv_elements/`)
//! - policy (per-concern overwrite policies)
//! - location (resolved project location)
//! - numeric (finite checks, arithmetic ranges, artifact label formatting)
//! - error (shared error types)

pub mod error;
pub mod location;
pub mod numeric;
pub mod policy;
pub mod table;

pub use error::{CoreError, CoreResult};
pub use location::Location;
pub use numeric::*;
pub use policy::{CellUpdate, OverwritePolicies, OverwritePolicy};
pub use table::{CellRef, LabeledTable, is_missing};
