//! Query language for selecting conversations (`plugin:weather content:code`)

pub mod apply;
pub mod ast;
pub mod parser;

pub use apply::{apply_filters, matches};
pub use ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};
pub use parser::parse_filter;
