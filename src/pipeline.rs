//! Stages run around a validation batch.
//!
//! Stages are a closed set invoked in declaration order: `before_validation`
//! over the endpoints about to be probed, `after_validation` over the results.

use std::collections::HashSet;

use log::info;

use crate::models::{Endpoint, ValidationResult};

/// A step applied before and after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Drops endpoints whose normalized key was already seen.
    RemoveDuplicates,
    /// Logs the working/total summary once results are in.
    CollectStats,
}

impl PipelineStage {
    fn before_validation(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        match self {
            PipelineStage::RemoveDuplicates => {
                let mut seen = HashSet::new();
                endpoints
                    .into_iter()
                    .filter(|endpoint| seen.insert(endpoint.key().to_string()))
                    .collect()
            }
            PipelineStage::CollectStats => endpoints,
        }
    }

    fn after_validation(&self, results: &[ValidationResult]) {
        match self {
            PipelineStage::RemoveDuplicates => {}
            PipelineStage::CollectStats => {
                let working = results.iter().filter(|r| r.is_alive()).count();
                info!("Validation complete: {}/{} working", working, results.len());
            }
        }
    }
}

/// Ordered list of stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn before_validation(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        self.stages
            .iter()
            .fold(endpoints, |acc, stage| stage.before_validation(acc))
    }

    pub fn after_validation(&self, results: &[ValidationResult]) {
        for stage in &self.stages {
            stage.after_validation(results);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(vec![PipelineStage::RemoveDuplicates, PipelineStage::CollectStats])
    }
}
