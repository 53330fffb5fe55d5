pub mod sexp;

// Re-export for convenience
pub use sexp::{ParseError, SExp, SExpParser};
