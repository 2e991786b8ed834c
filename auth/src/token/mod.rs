pub mod errors;
pub mod issuer;
pub mod settings;
pub mod validator;

pub use errors::TokenError;
pub use issuer::TokenIssuer;
pub use issuer::TokenPair;
pub use settings::TokenSettings;
pub use validator::JtiDenyList;
pub use validator::TokenValidator;
