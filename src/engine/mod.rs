//! Intent resolution and session dispatch.
//!
//! - `Interpreter`: user text → `Intent`, never fails
//! - `Resolver`: line item → unique / ambiguous / not found
//! - `SessionStore`: user → active cart, with a per-user critical section
//! - `Dispatcher`: executes intents against the store
//! - `format_result`: `ActionResult` → chat text
//! - `Agent`: wires the above for one inbound message

mod agent;
mod dispatcher;
mod formatter;
mod interpreter;
mod resolver;
mod session;

#[cfg(test)]
pub(crate) mod fakes;

pub use agent::*;
pub use dispatcher::*;
pub use formatter::*;
pub use interpreter::*;
pub use resolver::*;
pub use session::*;
