//! DSE measure catalog
//!
//! Catalog measures are reusable scripts stored in a directory together with a
//! `measure.json` descriptor. A descriptor names the measure, gives it a stable
//! uuid plus a version uuid, says which kind of model it edits and lists the
//! arguments the script accepts.
//!
//! # Core Concepts
//!
//! - **BclMeasure**: one catalog entry; its [`MeasureType`] fixes the file types
//! - **Argument**: a named, typed script input with optional value and default
//!
//! # Example
//!
//! ```rust,ignore
//! use dse_bcl::{Argument, BclMeasure, MeasureType};
//!
//! let measure = BclMeasure::new("Set Window to Wall Ratio", "measures/wwr", MeasureType::ModelMeasure)
//!     .with_argument(Argument::make_double_argument("wwr", true));
//!
//! assert!(measure.arguments()[0].is_required());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod argument;
pub mod error;
pub mod measure;

pub use argument::{Argument, ArgumentType, ArgumentValue};
pub use error::BclError;
pub use measure::{BclMeasure, MeasureType, DESCRIPTOR_FILE_NAME};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
