//! pdfgate Processing Library
//!
//! Document-to-PDF conversion behind the [`Converter`] trait. The job lifecycle only ever
//! sees `convert(input, format) -> pdf | error`; the engines here shell out to external
//! renderers inside a scratch directory that is removed when the call returns.

pub mod converter;
pub mod engines;
pub mod error;
pub mod router;
pub mod sanitize;

// Re-export commonly used types
pub use converter::{convert_with_timeout, ensure_pdf, Converter};
pub use error::ConvertError;
pub use router::DocumentConverter;
pub use sanitize::sanitize_message;
