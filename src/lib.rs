pub mod api;
pub mod connection;
pub mod error;
pub mod gql;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
