//! Clients for the external collaborators: the interpreter (OpenRouter) and
//! the catalog/cart service.

mod openrouter;
mod store;

pub use openrouter::*;
pub use store::*;
