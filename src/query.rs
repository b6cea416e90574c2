//! Query processing: Boolean set retrieval and ranked retrieval.

pub mod boolean;
pub mod ranked;

pub use boolean::BooleanQueryEngine;
pub use ranked::{QueryMode, RankedQueryEngine, ScoredDoc};
