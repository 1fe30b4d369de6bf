pub mod catalog;
pub mod config;
pub mod health;
pub mod saved_views;
pub mod tickets;
