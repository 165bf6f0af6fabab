pub mod error;
pub mod keyring;
pub mod models;
pub mod provider;
