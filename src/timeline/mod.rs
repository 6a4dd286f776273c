//! Balance timelines and the reconciliation merge

pub mod history;
pub mod merge;

pub use history::*;
pub use merge::*;
