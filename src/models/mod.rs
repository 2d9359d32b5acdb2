pub mod formulario;
pub mod pedido;
pub mod webhook;

pub use formulario::*;
pub use pedido::*;
pub use webhook::*;
