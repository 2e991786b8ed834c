pub mod provider;

pub use provider::HttpIdentityProvider;
