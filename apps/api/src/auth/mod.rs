// Credential Manager: registration, login, bearer tokens.

pub mod credentials;
pub mod handlers;
pub mod token;
