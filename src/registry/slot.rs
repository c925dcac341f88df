//! Injection slots and binding descriptions.
//!
//! A component exposes its injectable members by listing them in
//! `Component::bind`. Each listed [`Slot`] becomes an injection target.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::registry::container::Container;

/// Reserved tag resolving to the ordered list of every registered container.
pub const ALL_CONTAINERS: &str = "containers";

/// A write-once reference to another component.
///
/// `T` is either a concrete component type, a trait object (`dyn Trait`)
/// or `Vec<Container>` for the reserved [`ALL_CONTAINERS`] binding.
/// Clones share the same cell.
///
/// Values assigned by an inventory are released when that inventory is
/// dropped, so components bound to each other do not keep each other alive.
pub struct Slot<T: ?Sized> {
    cell: Arc<RwLock<Option<Arc<T>>>>,
}

impl<T: ?Sized> Slot<T> {
    /// An empty slot.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(RwLock::new(None)),
        }
    }

    /// A slot pre-filled by the caller; resolution leaves it untouched.
    pub fn with(value: Arc<T>) -> Self {
        Self {
            cell: Arc::new(RwLock::new(Some(value))),
        }
    }

    /// The assigned value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Assign the slot. Fails with the rejected value if it is already set.
    pub fn set(&self, value: Arc<T>) -> Result<(), Arc<T>> {
        let mut cell = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        if cell.is_some() {
            return Err(value);
        }
        *cell = Some(value);
        Ok(())
    }

    pub fn is_set(&self) -> bool {
        self.cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn clear(&self) {
        self.cell
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("type", &type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}

/// Type-erased access to a slot's cell.
trait Cell: Send + Sync {
    fn is_set(&self) -> bool;

    /// Assign from an erased `Arc<T>`. Returns false on a type mismatch or if already set.
    fn assign(&self, value: &(dyn Any + Send + Sync)) -> bool;

    fn clear(&self);
}

impl<T: ?Sized + Send + Sync + 'static> Cell for Slot<T> {
    fn is_set(&self) -> bool {
        Slot::is_set(self)
    }

    fn assign(&self, value: &(dyn Any + Send + Sync)) -> bool {
        match value.downcast_ref::<Arc<T>>() {
            Some(value) => self.set(Arc::clone(value)).is_ok(),
            None => false,
        }
    }

    fn clear(&self) {
        Slot::clear(self)
    }
}

/// An injectable member recorded at registration.
pub(crate) struct Target {
    pub(crate) owner: String,
    pub(crate) field: String,
    pub(crate) tag: Option<String>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    cell: Box<dyn Cell>,
}

impl Target {
    pub(crate) fn is_set(&self) -> bool {
        self.cell.is_set()
    }

    pub(crate) fn assign(&self, value: &(dyn Any + Send + Sync)) -> bool {
        self.cell.assign(value)
    }

    /// Empty the slot, dropping its reference.
    pub(crate) fn clear(&self) {
        self.cell.clear()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("owner", &self.owner)
            .field("field", &self.field)
            .field("tag", &self.tag)
            .field("type", &self.type_name)
            .field("set", &self.is_set())
            .finish()
    }
}

/// Binding description collected from `Component::bind`.
pub struct Bindings {
    owner: String,
    targets: Vec<Target>,
}

impl Bindings {
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            targets: Vec::new(),
        }
    }

    /// Declare an untagged slot, matched by type and member name.
    pub fn slot<T>(&mut self, field: &str, slot: &Slot<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.push(field, None, slot)
    }

    /// Declare a slot bound to the container named `tag`.
    pub fn tagged<T>(&mut self, field: &str, tag: &str, slot: &Slot<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.push(field, Some(tag.to_string()), slot)
    }

    /// Declare a slot receiving every registered container, in registration order.
    pub fn all(&mut self, field: &str, slot: &Slot<Vec<Container>>) -> &mut Self {
        self.tagged(field, ALL_CONTAINERS, slot)
    }

    fn push<T>(&mut self, field: &str, tag: Option<String>, slot: &Slot<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.targets.push(Target {
            owner: self.owner.clone(),
            field: field.to_string(),
            tag,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            cell: Box::new(slot.clone()),
        });
        self
    }

    pub(crate) fn into_targets(self) -> Vec<Target> {
        self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_slot_is_write_once() {
        let slot: Slot<u32> = Slot::new();
        assert!(!slot.is_set());
        slot.set(Arc::new(1)).unwrap();
        assert!(slot.set(Arc::new(2)).is_err());
        assert_eq!(*slot.get().unwrap(), 1);
    }

    #[test]
    fn test_clones_share_the_cell() {
        let slot: Slot<u32> = Slot::new();
        let other = slot.clone();
        other.set(Arc::new(7)).unwrap();
        assert_eq!(slot.get().map(|v| *v), Some(7));
    }

    #[test]
    fn test_targets_assign_trait_objects() {
        let slot: Slot<dyn Greeter> = Slot::new();
        let mut bindings = Bindings::new("Owner");
        bindings.slot("greeter", &slot);
        let targets = bindings.into_targets();

        let wrong: Arc<Hello> = Arc::new(Hello);
        assert!(!targets[0].assign(&wrong));

        let right: Arc<dyn Greeter> = Arc::new(Hello);
        assert!(targets[0].assign(&right));
        assert!(targets[0].is_set());
        assert_eq!(slot.get().unwrap().greet(), "hello");
    }

    #[test]
    fn test_prefilled_slot_rejects_assignment() {
        let slot = Slot::with(Arc::new(5u8));
        let mut bindings = Bindings::new("Owner");
        bindings.tagged("value", "five", &slot);
        let targets = bindings.into_targets();

        assert_eq!(targets[0].tag.as_deref(), Some("five"));
        assert!(!targets[0].assign(&Arc::new(6u8)));
        assert_eq!(*slot.get().unwrap(), 5);
    }

    #[test]
    fn test_cleared_target_releases_value() {
        let value = Arc::new(3u16);
        let slot: Slot<u16> = Slot::new();
        let mut bindings = Bindings::new("Owner");
        bindings.slot("value", &slot);
        let targets = bindings.into_targets();

        assert!(targets[0].assign(&value));
        assert_eq!(Arc::strong_count(&value), 2);

        targets[0].clear();
        assert!(!slot.is_set());
        assert_eq!(Arc::strong_count(&value), 1);
    }
}
