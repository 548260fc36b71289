pub mod analysis;
pub mod dashboard;
pub mod events;
pub mod health;
mod query;
