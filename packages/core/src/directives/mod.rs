//! User directives shipped with the engine.

mod repeat;

pub use repeat::repeat;
