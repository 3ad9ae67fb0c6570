// Document pagination engine.
// Raw lines → language profile + tokenizer → paginator → committed pages.
// Everything here is synchronous and CPU-bound; storage lives in `documents`.

pub mod language;
pub mod paginator;
pub mod tokenizer;

pub use language::Language;
pub use paginator::Paginator;
