//! HTTP clients for the upstream job-market providers.

mod adzuna;
mod chat;
mod error;
mod oauth;
mod taxonomy;

pub use adzuna::AdzunaClient;
pub use chat::AzureChatClient;
pub use error::ProviderError;
pub use oauth::ClientCredentialsIssuer;
pub use taxonomy::TitlesClient;
