use crate::{integrations::Integrations, model::ModelManager};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    integrations: Integrations,
}

impl AppState {
    pub fn new(mm: ModelManager, integrations: Integrations) -> Self {
        Self { mm, integrations }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }
}
