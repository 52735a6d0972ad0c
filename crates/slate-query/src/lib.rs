mod expression;
pub mod geo;
mod parse_filter;
mod tree;
pub mod value;

pub use expression::{CompareOp, Condition, Expression, InList, TEXT_PATH, TextQuery};
pub use parse_filter::{FilterParseError, parse_filter};
pub use tree::{MatchTree, Node, NodeId};
