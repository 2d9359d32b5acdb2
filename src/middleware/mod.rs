/// Middleware layer para o Axum router
///
/// - Autenticação das rotas administrativas

pub mod admin_auth;

pub use admin_auth::require_admin_key;
