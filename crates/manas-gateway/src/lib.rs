//! HTTP delivery for the chat pipeline: `POST /api/chat` and `GET /health`.

mod error;
mod handler;
mod handlers;
mod router;
mod server;

pub use error::{ApiError, GatewayError};
pub use handler::{ChatHandler, HandlerError, HandlerFuture};
pub use router::build_router;
pub use server::{DEFAULT_MAX_BODY_SIZE, GatewayServer};
