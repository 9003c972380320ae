pub mod converter;
pub mod coordinate;
pub mod error;
pub mod filters;
pub mod merger;
pub mod ontology;
pub mod parser;
pub mod pipeline;
pub mod types;
pub mod writer;

pub use converter::*;
pub use coordinate::*;
pub use error::*;
pub use filters::*;
pub use merger::*;
pub use ontology::*;
pub use parser::*;
pub use pipeline::*;
pub use types::*;
pub use writer::*;
