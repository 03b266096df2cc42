use std::collections::BTreeMap;

use anyhow::Result;

use chainlift_core::{StepExecutor, UpgradeError, UpgradePlan};

// Closed set of version handlers; lookups happen once per plan before any
// step runs, so an unregistered version can never fail mid-upgrade.
#[derive(Default)]
pub struct ExecutorRegistry {
    handlers: BTreeMap<u64, Box<dyn StepExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, major: u64, executor: Box<dyn StepExecutor>) {
        self.handlers.insert(major, executor);
    }

    pub fn get(&self, major: u64) -> Option<&dyn StepExecutor> {
        self.handlers.get(&major).map(Box::as_ref)
    }

    pub fn registered_majors(&self) -> Vec<u64> {
        self.handlers.keys().copied().collect()
    }

    pub fn resolve(&self, plan: &UpgradePlan) -> Result<Vec<&dyn StepExecutor>> {
        let mut executors = Vec::with_capacity(plan.steps().len());
        for step in plan.steps() {
            let major = step.to.major();
            let executor = self
                .get(major)
                .ok_or(UpgradeError::NoHandler(major))?;
            executors.push(executor);
        }
        Ok(executors)
    }
}
