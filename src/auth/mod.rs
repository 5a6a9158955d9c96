pub mod evaluator;
pub mod token_store;

pub use evaluator::{AuthDecision, Authorizer, BYPASS_USER_ID, OWNER_COLUMN};
pub use token_store::{token_fingerprint, CallerIdentity, MySqlTokenStore, TokenError, TokenStore};
