use super::traits::CtxWithInspection;
use crate::config::Config;
use roof_inspection::RoofInspector;
use std::sync::Arc;

#[derive(Clone)]
pub struct Ctx {
    config: Arc<Config>,
    inspector: Arc<dyn RoofInspector>,
}

impl Ctx {
    pub fn new(config: Config, inspector: Arc<dyn RoofInspector>) -> Self {
        Self {
            config: Arc::new(config),
            inspector,
        }
    }
}

impl CtxWithInspection for Ctx {
    fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    fn inspector(&self) -> Arc<dyn RoofInspector> {
        self.inspector.clone()
    }
}
