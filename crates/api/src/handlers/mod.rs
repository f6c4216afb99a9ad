pub mod admin;
pub mod stories;
