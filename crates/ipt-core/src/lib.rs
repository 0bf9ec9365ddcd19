pub mod diff;
pub mod error;
pub mod model;
pub mod parser;
pub mod summary;
pub mod tokenizer;

pub use diff::*;
pub use error::*;
pub use model::*;
pub use parser::*;
pub use summary::*;
pub use tokenizer::*;
