pub mod auth;
pub mod push;
pub mod task;
