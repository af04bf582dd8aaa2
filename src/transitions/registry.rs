use std::collections::HashMap;

use tracing::warn;

use crate::{
    error::{Result, TransitionError},
    transitions::{FadeTransition, SlideTransition, Transition, ZoomTransition},
    video::types::TransitionType,
};

type TransitionFactory = Box<dyn Fn() -> Box<dyn Transition> + Send + Sync>;

/// Registry for managing available transitions
///
/// Transitions are registered by name and instantiated on demand, one
/// instance per job.
pub struct TransitionRegistry {
    transitions: HashMap<String, TransitionFactory>,
}

impl TransitionRegistry {
    /// Create a new registry with the built-in fade, slide and zoom
    pub fn new() -> Self {
        let mut registry = Self {
            transitions: HashMap::new(),
        };

        registry.register_builtin_transitions();
        registry
    }

    fn register_builtin_transitions(&mut self) {
        self.register("fade", || Box::new(FadeTransition::new()));
        self.register("slide", || Box::new(SlideTransition::new()));
        self.register("zoom", || Box::new(ZoomTransition::new()));
    }

    /// Register a custom transition, replacing any previous one of that name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Transition> + Send + Sync + 'static,
    {
        self.transitions.insert(name.into(), Box::new(factory));
    }

    /// Get a transition by name
    pub fn get_by_name(&self, name: &str) -> Option<Box<dyn Transition>> {
        self.transitions.get(name).map(|factory| factory())
    }

    /// Resolve the strategy for a settings value
    ///
    /// `TransitionType::None` resolves to `Ok(None)`: images are simply cut.
    pub fn resolve(&self, transition_type: TransitionType) -> Result<Option<Box<dyn Transition>>> {
        if transition_type.is_none() {
            return Ok(None);
        }

        let name = transition_type.as_str();
        if !self.has(name) {
            warn!(
                "No transition registered as {} (available: {})",
                name,
                self.available().join(", ")
            );
            return Err(TransitionError::NotFound {
                name: name.to_string(),
            }
            .into());
        }
        Ok(self.get_by_name(name))
    }

    /// Get all available transition names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.transitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
