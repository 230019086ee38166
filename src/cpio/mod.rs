//! CPIO archive family: format detection, parsing, container view

pub mod container;
pub mod parser;
pub mod types;

pub use container::CpioContainer;
pub use parser::CpioArchive;
pub use types::{CpioEntry, CpioFormat};
