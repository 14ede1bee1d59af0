pub mod assemble;
pub mod graph;
