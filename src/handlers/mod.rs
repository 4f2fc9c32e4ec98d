//! Handler trait and the function-backed convenience implementation.

mod handler;
mod handler_fn;

pub use handler::Handler;
pub use handler_fn::HandlerFn;
