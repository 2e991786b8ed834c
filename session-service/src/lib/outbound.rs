pub mod oidc;
pub mod repositories;
pub mod state_store;
