pub mod api;
pub mod cli;
pub mod extract;
pub mod store;
