// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token and session acquisition endpoints that do not require authentication.

pub mod login;    // POST /api-auth/login - open a cookie session
pub mod register; // POST /auth/register - create new account
pub mod token;    // POST /api-token-auth - exchange credentials for a token
pub mod utils;

pub use login::login_post;
pub use register::register_post;
pub use token::token_post;
