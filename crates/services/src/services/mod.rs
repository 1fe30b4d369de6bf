pub mod config;
pub mod forms;
pub mod notify;
pub mod tickets;
pub mod views;
