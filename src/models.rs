pub mod auth;
pub mod program;
pub mod reference;
pub mod role;
pub mod settings;
pub mod worker;
