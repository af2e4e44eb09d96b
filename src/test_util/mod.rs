pub mod downing;
pub mod node;
