use adgen_core::steps::{CreatedResource, Step};

/// Remote resources created by one attempt, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepLedger {
    created: Vec<CreatedResource>,
}

impl StepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful step. Blank identifiers are not recorded.
    pub fn record(&mut self, step: Step, id: &str) {
        if id.trim().is_empty() {
            return;
        }
        self.created.push(CreatedResource {
            step,
            id: id.to_string(),
        });
    }

    pub fn created(&self) -> &[CreatedResource] {
        &self.created
    }

    #[cfg(test)]
    fn id_for(&self, step: Step) -> Option<&str> {
        self.created
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub fn into_created(self) -> Vec<CreatedResource> {
        self.created
    }
}
