//! OAuth2 login and token lifecycle.
//!
//! Credential flow:
//! 1. `Credentials::resolve()` merges explicit values with the environment
//! 2. `handshake::authorize()` drives the browser through login and consent
//! 3. The authorization code is exchanged at the token endpoint
//! 4. `Authenticator::save_tokens()` persists the pair for later runs
//! 5. `Authenticator::refresh_tokens()` mints a new pair on demand

pub mod authenticator;
pub mod browser;
pub mod credentials;
pub mod handshake;
pub mod pkce;
pub mod tokens;

pub use authenticator::Authenticator;
pub use browser::{BrowserLauncher, BrowserSession, ChromeLauncher, Selector};
pub use credentials::{CredentialOverrides, Credentials};
pub use handshake::{authorize, AuthorizeSettings};
pub use tokens::{TokenEndpoint, TokenPair};
