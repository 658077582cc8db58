#[macro_use]
extern crate log;

mod app;
mod core;
mod server;

pub mod config;
pub mod log_store;
pub mod middleware;
pub mod module;
pub mod modules;
pub mod static_files;

pub use crate::core::assembler::ConnectionAssembler;
pub use crate::core::context::RequestContext;
pub use crate::core::http::{Http, RequestPart};
pub use crate::core::middleware::{Flow, Middleware, MiddlewareChain};
pub use crate::core::request::{Method, Request, RequestHead};
pub use crate::core::response::{encode, Response};
pub use crate::core::route::{Handler, Route};
pub use crate::core::router::{Resolution, Router};
pub use crate::core::writer::{escape_html, ResponseWriter};

pub use app::testing;
pub use app::App;

pub use config::{Config, ConfigError};
pub use module::Module;
pub use server::{Server, ServerError};
pub use static_files::{StaticContent, StaticFiles};
