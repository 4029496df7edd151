pub mod account;
pub mod analytics;
pub mod chat;
pub mod courses;
pub mod exercises;
pub mod learning;
pub mod payments;
