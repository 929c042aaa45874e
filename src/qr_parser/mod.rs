//! Parser for the Qr query DSL (criteria, pager, sorter, projection).

pub mod criteria;
pub mod document;
pub mod errors;
pub mod operator;

pub use criteria::{CriteriaNode, LeafValue, Scalar};
pub use document::{
    parse_document, parse_document_str, Pager, Projection, QueryDocument, SortDirection, SortKey,
    Sorter,
};
pub use errors::QrParseError;
pub use operator::{Arity, Connector, Operator};
