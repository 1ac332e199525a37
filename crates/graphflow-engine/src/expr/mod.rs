//! The `@{SESSION_ID}.path` reference grammar: parsing and resolution
//! against a session's rolling output window.

mod parser;
mod resolver;

pub use parser::{PathSegment, Reference, SENTINEL_PREFIX, TemplatePart, parse_template};
pub use resolver::{Outputs, Unresolved, resolve_value};
