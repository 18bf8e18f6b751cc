#![doc = include_str!("../README.md")]

pub mod event;
pub mod node;
pub mod parse;
pub mod record;
mod serialize;
mod value;

pub use event::{Event, EventListener};
pub use node::{Namespace, Node, NodeType};
pub use parse::{parse_fragment, MarkupError};
pub use record::Edit;
pub use value::PropertyValue;
