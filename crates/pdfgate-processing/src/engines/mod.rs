//! Process-backed rendering engines.

mod command;
mod html;
mod office;

pub use command::validate_binary_path;
pub use html::WeasyprintEngine;
pub use office::LibreOfficeEngine;
