//! Chinwag is a terminal chat client that keeps several independent
//! conversations and talks to a hosted model through a thin relay.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the session registry and its persistence,
//!   the single in-flight exchange, and the network task that consumes
//!   streamed or whole responses.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the wire payloads exchanged with the relay and the
//!   text-extraction rules for whole-document responses.
//! - [`relay`] is the stateless proxy (`chinwag serve`) that forwards chat
//!   requests to the upstream provider and mirrors its response unmodified.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions or [`relay`] for the proxy.

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod relay;
pub mod ui;
pub mod utils;
