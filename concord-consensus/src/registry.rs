use std::collections::HashMap;

use concord_common::AbstractionId;
use tracing::warn;

use crate::abstraction::Abstraction;

/// Abstraction instances of one run, indexed by id.
#[derive(Default)]
pub struct Registry {
    instances: HashMap<AbstractionId, Box<dyn Abstraction>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
        }
    }

    /// Installs `abstraction` under `id`. An existing instance is destroyed and replaced.
    pub fn register(&mut self, id: AbstractionId, abstraction: Box<dyn Abstraction>) {
        if let Some(mut old) = self.instances.insert(id.clone(), abstraction) {
            warn!("replacing existing instance {}", id);
            old.destroy();
        }
    }

    pub fn register_all(&mut self, instances: Vec<(AbstractionId, Box<dyn Abstraction>)>) {
        for (id, abstraction) in instances {
            self.register(id, abstraction);
        }
    }

    pub fn contains(&self, id: &AbstractionId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn get_mut(&mut self, id: &AbstractionId) -> Option<&mut Box<dyn Abstraction>> {
        self.instances.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AbstractionId> {
        self.instances.keys()
    }

    /// Destroys and drops `root` and every instance below it. Returns how many went.
    pub fn remove_within(&mut self, root: &AbstractionId) -> usize {
        let doomed: Vec<AbstractionId> = self.ids().filter(|id| id.is_within(root)).cloned().collect();
        for id in &doomed {
            if let Some(mut abstraction) = self.instances.remove(id) {
                abstraction.destroy();
            }
        }
        doomed.len()
    }

    /// Destroys and drops every instance.
    pub fn destroy_all(&mut self) {
        for (_, mut abstraction) in self.instances.drain() {
            abstraction.destroy();
        }
    }
}
