// Handlers HTTP
pub mod endpoints;
pub mod formularios;
pub mod health;
pub mod pedidos;
pub mod webhook;

pub use endpoints::*;
pub use formularios::*;
pub use health::*;
pub use pedidos::*;
pub use webhook::*;

#[cfg(test)]
mod tests;
