//! Commonly used imports for modules in this crate

pub use crate::error::AdmissionError;
pub use crate::types::Timestamp;

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
