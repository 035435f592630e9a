pub mod config;
pub mod ctx;
pub mod render;
pub mod routes;
pub mod standalone;

pub use config::Config;
pub use ctx::{default::Ctx, traits::CtxWithInspection};
