pub mod credentials;
pub mod session;
