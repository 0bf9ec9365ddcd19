pub mod capture;
pub mod loader;

pub use capture::*;
pub use loader::*;
