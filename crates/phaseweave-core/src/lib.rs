mod document;
mod merge;
mod sanitize;
mod validation;

pub use document::*;
pub use merge::*;
pub use sanitize::*;
pub use validation::*;
