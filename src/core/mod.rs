// Core module - Fundamental traits
pub mod scanner_trait;

pub use scanner_trait::PortScanner;
