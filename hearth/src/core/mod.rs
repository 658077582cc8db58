pub mod assembler;
pub mod context;
pub mod http;
pub mod middleware;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod writer;
