pub mod backend;
pub mod banner;
pub mod connection_dialog;
pub mod frontend;
pub mod graph_view;
pub mod layout;
pub mod viewport;
