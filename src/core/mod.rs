// core/mod.rs
pub mod auth;

// Ré-exports pour faciliter l'import
pub use auth::{AuthService, AuthTokens, HttpIdentityProvider, IdentityProvider, IdpUser, JwtClaims, TokenType};
