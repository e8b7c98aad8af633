// src/application/mod.rs
//
// Application Layer
//
// ARCHITECTURE:
// - Wires stores, broker and services into one AppState
// - The boundary for outer surfaces (HTTP, CLI): they call services through
//   AppState and map errors through ErrorResponse

pub mod error_handling;
pub mod state;

pub use error_handling::{ErrorResponse, ErrorType, ToErrorResponse};
pub use state::AppState;
