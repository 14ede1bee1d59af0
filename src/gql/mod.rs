pub mod query_builder;
pub mod query_interface;
