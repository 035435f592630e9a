use crate::config::Config;
use roof_inspection::RoofInspector;
use std::sync::Arc;

/// What the routes need from the server context.
pub trait CtxWithInspection: Sync {
    fn config(&self) -> Arc<Config>;
    fn inspector(&self) -> Arc<dyn RoofInspector>;
}
