//! Container: the inventory's metadata wrapper around a registered component.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::registry::component::Component;
use crate::registry::options::{Configurable, Mutator};

/// A second `with_name` was applied to the same registration.
#[derive(Debug, Error)]
#[error("container is already named `{existing}`, cannot rename it to `{requested}`")]
pub struct NameTaken {
    pub existing: String,
    pub requested: String,
}

/// Strip the module path and generic arguments from a type name.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Naming stage of a registration, configured through `init`.
#[derive(Debug)]
pub struct ContainerSpec {
    type_name: &'static str,
    name: String,
    forced: bool,
}

impl ContainerSpec {
    pub(crate) fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            name: String::new(),
            forced: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_name(self) -> String {
        self.name
    }
}

impl Configurable for ContainerSpec {
    fn defaults(&mut self) {
        self.name = short_type_name(self.type_name).to_string();
        self.forced = false;
    }
}

/// Override the container name, which defaults to the component's bare type name.
///
/// Names are what tagged slots refer to; name a component whenever its type is
/// not unique in the inventory.
pub fn with_name(name: impl Into<String>) -> Mutator {
    let name = name.into();
    Mutator::new(move |spec: &mut ContainerSpec| {
        if spec.forced {
            return Err(NameTaken {
                existing: spec.name.clone(),
                requested: name.clone(),
            }
            .into());
        }
        spec.name = name.clone();
        spec.forced = true;
        Ok(())
    })
}

/// A trait-object view of a component.
struct View {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Interfaces a component can be injected as.
///
/// Filled by `Component::interfaces`:
/// `out.provide::<dyn HealthCheck>(this.clone())`.
#[derive(Default)]
pub struct Interfaces {
    views: Vec<View>,
}

impl Interfaces {
    pub fn provide<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.views.push(View {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Box::new(value),
        });
        self
    }
}

struct Inner {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
    views: Vec<View>,
    component: Option<Arc<dyn Component>>,
}

/// A registered component, identified by its name.
///
/// Cloning is cheap; clones share the same component.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub(crate) fn new<T: Component>(component: Arc<T>, name: String) -> Self {
        let mut interfaces = Interfaces::default();
        T::interfaces(&component, &mut interfaces);

        let erased: Arc<dyn Component> = component.clone();
        Self {
            inner: Arc::new(Inner {
                name,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                value: Box::new(component),
                views: interfaces.views,
                component: Some(erased),
            }),
        }
    }

    /// The synthetic container behind the reserved `containers` tag.
    pub(crate) fn all(containers: Vec<Container>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: crate::registry::slot::ALL_CONTAINERS.to_string(),
                type_id: TypeId::of::<Vec<Container>>(),
                type_name: type_name::<Vec<Container>>(),
                value: Box::new(Arc::new(containers)),
                views: Vec::new(),
                component: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Full type name of the registered component.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// The registered component. `None` only for the synthetic `containers` entry.
    pub fn component(&self) -> Option<&Arc<dyn Component>> {
        self.inner.component.as_ref()
    }

    /// The component as its concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// The component as `T`, which is either its concrete type or one of its interfaces.
    pub fn view<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value_for(TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Whether the component was declared to implement the trait object `type_id`.
    pub(crate) fn implements(&self, type_id: TypeId) -> bool {
        self.inner.views.iter().any(|v| v.type_id == type_id)
    }

    /// The erased `Arc` to assign to a slot of type `type_id`.
    pub(crate) fn value_for(&self, type_id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
        if self.inner.type_id == type_id {
            return Some(self.inner.value.as_ref());
        }
        self.inner
            .views
            .iter()
            .find(|v| v.type_id == type_id)
            .map(|v| v.value.as_ref())
    }

    /// Names of the interfaces this component provides.
    pub fn interfaces(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.inner.views.iter().map(|v| v.type_name)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("type", &self.inner.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::options::init;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("scaffolder::health::HealthChecker"), "HealthChecker");
        assert_eq!(short_type_name("app::Cache<alloc::string::String>"), "Cache");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_spec_defaults_to_type_name() {
        let mut spec = ContainerSpec::new("app::db::Pool");
        init(&mut spec, &[]).unwrap();
        assert_eq!(spec.name(), "Pool");
    }

    #[test]
    fn test_with_name_overrides_once() {
        let mut spec = ContainerSpec::new("app::db::Pool");
        init(&mut spec, &[with_name("primary")]).unwrap();
        assert_eq!(spec.name(), "primary");

        let mut spec = ContainerSpec::new("app::db::Pool");
        let err = init(&mut spec, &[with_name("primary"), with_name("replica")]).unwrap_err();
        assert!(err.to_string().contains("already named `primary`"));
    }
}
