pub mod alert;
pub mod line;
pub mod user;
