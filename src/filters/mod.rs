pub mod consequence;
pub mod evidence;
pub mod frequency;
pub mod predictive;
pub mod score;
pub mod tier;

pub use consequence::*;
pub use evidence::*;
pub use frequency::*;
pub use predictive::*;
pub use score::*;
pub use tier::*;
