pub mod draft;
pub mod enums;
pub mod record;

pub use draft::*;
pub use enums::*;
pub use record::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Unknown draft field: {0}")]
    UnknownField(String),
}
