#![allow(clippy::useless_conversion)]

pub mod history;
pub mod ids;
pub mod item;
pub mod location;
pub mod saved_view;
pub mod technician;
pub mod ticket;
pub mod ticket_note;
pub mod user;
