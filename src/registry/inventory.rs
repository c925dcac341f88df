//! Inventory: component registration and dependency resolution.
//!
//! # Resolution rules
//! ```text
//! For every unset slot, first satisfied rule wins, first container within it:
//!     1. Tag          slot tag == container name
//!     2. TypeAndName  slot type == container type && slot field == container name
//!     3. Type         slot type == container type
//!     4. Interface    container provides the slot's trait object
//! ```
//!
//! # Design Decisions
//! - Flat matching pass, no graph: cycles are fine, assignment clones an `Arc`
//! - O(slots × rules × containers); meant for a few dozen components
//! - First registration error is sticky and returned by every `compile`

use std::any::type_name;
use std::fmt;
use std::iter;
use std::sync::Arc;

use crate::registry::component::Component;
use crate::registry::container::{Container, ContainerSpec};
use crate::registry::options::{init, Mutator};
use crate::registry::slot::{Bindings, Target};
use crate::registry::types::{InventoryResult, RegistrationError, ResolveError};

/// What happens to a tagged slot whose tag names no container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingPolicy {
    /// Fall through to the type-based rules; leave the slot unset if nothing matches.
    #[default]
    Lenient,
    /// Fail `compile` with `ResolveError::Unmatched`.
    Strict,
}

/// Matching rules, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Tag,
    TypeAndName,
    Type,
    Interface,
}

impl Rule {
    pub const ORDER: [Rule; 4] = [Rule::Tag, Rule::TypeAndName, Rule::Type, Rule::Interface];

    fn matches(self, target: &Target, container: &Container) -> bool {
        match self {
            Rule::Tag => target.tag.as_deref() == Some(container.name()),
            Rule::TypeAndName => {
                container.type_id() == target.type_id && container.name() == target.field
            }
            Rule::Type => container.type_id() == target.type_id,
            Rule::Interface => container.implements(target.type_id),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Tag => "tag",
            Rule::TypeAndName => "type+name",
            Rule::Type => "type",
            Rule::Interface => "interface",
        };
        f.write_str(name)
    }
}

/// Ordered collection of registered components.
#[derive(Default)]
pub struct Inventory {
    containers: Vec<Container>,
    targets: Vec<Target>,
    // Indexes into `targets` of the slots filled by `compile`.
    assigned: Vec<usize>,
    add_err: Option<RegistrationError>,
    policy: BindingPolicy,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: BindingPolicy) -> Self {
        let mut inventory = Self::default();
        inventory.policy = policy;
        inventory
    }

    pub fn policy(&self) -> BindingPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: BindingPolicy) {
        self.policy = policy;
    }

    /// Register a component, configuring it with the mutators written for `T`.
    ///
    /// `ContainerSpec` mutators (`with_name`) from the same list name the container.
    pub fn add<T: Component>(&mut self, mut component: T, mutators: &[Mutator]) -> &mut Self {
        if self.add_err.is_some() {
            return self;
        }
        if let Err(source) = init(&mut component, mutators) {
            return self.fail(RegistrationError::Configure {
                component: type_name::<T>(),
                source,
            });
        }
        self.register(Arc::new(component), mutators)
    }

    /// Register an already-built component.
    ///
    /// Component mutators are only accepted while `component` has no other owner.
    pub fn add_arc<T: Component>(&mut self, mut component: Arc<T>, mutators: &[Mutator]) -> &mut Self {
        if self.add_err.is_some() {
            return self;
        }
        if mutators.iter().any(Mutator::applies_to::<T>) {
            let Some(inner) = Arc::get_mut(&mut component) else {
                return self.fail(RegistrationError::SharedComponent {
                    component: type_name::<T>(),
                });
            };
            if let Err(source) = init(inner, mutators) {
                return self.fail(RegistrationError::Configure {
                    component: type_name::<T>(),
                    source,
                });
            }
        }
        self.register(component, mutators)
    }

    fn register<T: Component>(&mut self, component: Arc<T>, mutators: &[Mutator]) -> &mut Self {
        let mut spec = ContainerSpec::new(type_name::<T>());
        if let Err(source) = init(&mut spec, mutators) {
            return self.fail(RegistrationError::Container {
                component: type_name::<T>(),
                source,
            });
        }
        let name = spec.into_name();

        let mut bindings = Bindings::new(name.clone());
        component.bind(&mut bindings);
        let targets = bindings.into_targets();

        tracing::debug!(
            name = %name,
            component = type_name::<T>(),
            slots = targets.len(),
            "Component registered"
        );

        self.containers.push(Container::new(component, name));
        self.targets.extend(targets);
        self
    }

    fn fail(&mut self, err: RegistrationError) -> &mut Self {
        tracing::warn!(error = %err, "Component registration failed");
        self.add_err = Some(err);
        self
    }

    /// The first registration error, if any.
    pub fn error(&self) -> Option<&RegistrationError> {
        self.add_err.as_ref()
    }

    /// Registered containers, in registration order.
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Look up a component by container name and concrete type.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.containers
            .iter()
            .filter(|c| c.name() == name)
            .find_map(Container::downcast::<T>)
    }

    /// Fill every unset slot. Safe to call more than once.
    pub fn compile(&mut self) -> InventoryResult<()> {
        if let Some(err) = &self.add_err {
            return Err(err.clone().into());
        }

        let all = Container::all(self.containers.clone());
        let mut assigned = Vec::new();
        let bound = self.bind_targets(&all, &mut assigned);
        // Slots bound before a failure are released on drop as well.
        self.assigned.append(&mut assigned);
        let resolved = bound?;

        tracing::debug!(
            containers = self.containers.len(),
            slots = self.targets.len(),
            resolved,
            "Inventory compiled"
        );
        Ok(())
    }

    fn bind_targets(&self, all: &Container, assigned: &mut Vec<usize>) -> InventoryResult<usize> {
        let mut resolved = 0usize;
        for (index, target) in self.targets.iter().enumerate() {
            if target.is_set() {
                continue;
            }
            match self.resolve(target, all)? {
                Some((container, rule)) => {
                    let ok = container
                        .value_for(target.type_id)
                        .is_some_and(|value| target.assign(value));
                    if !ok {
                        return Err(incompatible(target, container).into());
                    }
                    assigned.push(index);
                    tracing::debug!(
                        owner = %target.owner,
                        field = %target.field,
                        container = %container.name(),
                        rule = %rule,
                        "Slot bound"
                    );
                    resolved += 1;
                }
                None => {
                    tracing::debug!(
                        owner = %target.owner,
                        field = %target.field,
                        tag = ?target.tag,
                        slot_type = target.type_name,
                        "Slot left unset"
                    );
                }
            }
        }
        Ok(resolved)
    }

    fn resolve<'a>(
        &'a self,
        target: &Target,
        all: &'a Container,
    ) -> Result<Option<(&'a Container, Rule)>, ResolveError> {
        let candidates = || self.containers.iter().chain(iter::once(all));

        if let Some(tag) = &target.tag {
            if let Some(container) = candidates().find(|c| Rule::Tag.matches(target, c)) {
                return Ok(Some((container, Rule::Tag)));
            }
            if self.policy == BindingPolicy::Strict {
                return Err(ResolveError::Unmatched {
                    owner: target.owner.clone(),
                    field: target.field.clone(),
                    tag: tag.clone(),
                });
            }
        }

        Ok(Rule::ORDER[1..].iter().find_map(|rule| {
            candidates()
                .find(|c| rule.matches(target, c))
                .map(|c| (c, *rule))
        }))
    }
}

fn incompatible(target: &Target, container: &Container) -> ResolveError {
    ResolveError::Incompatible {
        owner: target.owner.clone(),
        field: target.field.clone(),
        container: container.name().to_string(),
        provided: container.type_name(),
        expected: target.type_name,
    }
}

/// Empties every slot `compile` filled. Components bound to each other, or
/// to the `containers` list, would otherwise keep each other alive.
impl Drop for Inventory {
    fn drop(&mut self) {
        for &index in &self.assigned {
            self.targets[index].clear();
        }
        tracing::trace!(released = self.assigned.len(), "Inventory dropped");
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("containers", &self.containers)
            .field("targets", &self.targets)
            .field("assigned", &self.assigned.len())
            .field("add_err", &self.add_err)
            .field("policy", &self.policy)
            .finish()
    }
}
