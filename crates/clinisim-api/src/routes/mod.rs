pub mod cases;
pub mod chat;
pub mod health;
pub mod investigations;
pub mod sessions;
pub mod submission;
