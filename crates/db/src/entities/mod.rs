pub mod history;
pub mod item;
pub mod location;
pub mod mmodel;
pub mod saved_view;
pub mod technician;
pub mod ticket;
pub mod ticket_note;
pub mod user;
