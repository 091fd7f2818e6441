pub mod auth;
pub mod purchases;
pub mod shop;
pub mod statistics;
pub mod submissions;
pub mod tasks;
pub mod users;
