//! Credentials for providers that exchange a long-lived secret for
//! short-lived access tokens.

pub mod exchange;
pub mod store;

pub use exchange::{MAX_WAIT, TOKEN_URL, TokenExchange, parse_token_response};
pub use store::{
    ACCESS_TOKEN_ENV, AccessToken, Credential, CredentialCache, Endpoints, HOSTED_ENV, SECRET_ENV,
    SecretResolver, mask_token,
};
