pub mod auth;
pub mod health;
pub mod programs;
pub mod reference;
pub mod settings;
pub mod workers;
