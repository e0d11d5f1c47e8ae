//! Which field types can be picked from the scene, and what they accept.
//!
//! The set of shapes is closed: a bare node reference (`Entity`,
//! `Option<Entity>`), a reference to a concrete component ([`ComponentRef`]),
//! a reference to any component carrying a capability ([`CapabilityRef`]), or
//! a list/array of any of these.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use bevy::prelude::*;
use bevy::reflect::{FromType, TypeData, TypeInfo, TypePath, TypeRegistry};

/// What kind of scene object a pickable field accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickTarget {
    /// Any scene node.
    Node,
    /// Entities holding this exact component type.
    Component {
        type_id: TypeId,
        type_path: &'static str,
    },
    /// Entities holding any component whose registration carries the type data `data`.
    Capability { data: TypeId, name: &'static str },
}

impl PickTarget {
    /// Human readable name, used for candidate labels.
    pub fn type_name(&self) -> &'static str {
        match self {
            PickTarget::Node => "Entity",
            PickTarget::Component { type_path, .. } => short_name(type_path),
            PickTarget::Capability { name, .. } => name,
        }
    }
}

fn short_name(type_path: &'static str) -> &'static str {
    let base = type_path.split('<').next().unwrap_or(type_path);
    base.rsplit("::").next().unwrap_or(base)
}

/// A scene object a field can point at: an entity, or one component on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PickedObject {
    pub entity: Entity,
    pub component: Option<TypeId>,
}

impl PickedObject {
    pub fn node(entity: Entity) -> Self {
        Self {
            entity,
            component: None,
        }
    }

    pub fn component(entity: Entity, component: TypeId) -> Self {
        Self {
            entity,
            component: Some(component),
        }
    }
}

/// A reflected field value that holds a scene reference.
pub trait PickField: PartialReflect {
    fn target() -> PickTarget
    where
        Self: Sized;

    fn picked(&self) -> Option<PickedObject>;

    fn assign(&mut self, object: Option<PickedObject>);
}

/// Type data for [`PickField`] types, so a field can be inspected and written
/// without knowing its concrete type.
#[derive(Clone)]
pub struct ReflectPickField {
    target: fn() -> PickTarget,
    picked: fn(&dyn PartialReflect) -> Option<Option<PickedObject>>,
    assign: fn(&mut dyn PartialReflect, Option<PickedObject>) -> bool,
}

impl ReflectPickField {
    pub fn target(&self) -> PickTarget {
        (self.target)()
    }

    /// Current reference, or `None` if `value` is not of the registered type.
    pub fn picked(&self, value: &dyn PartialReflect) -> Option<Option<PickedObject>> {
        (self.picked)(value)
    }

    /// Returns `false` if `value` is not of the registered type.
    pub fn assign(&self, value: &mut dyn PartialReflect, object: Option<PickedObject>) -> bool {
        (self.assign)(value, object)
    }
}

impl<T: PickField + Reflect> FromType<T> for ReflectPickField {
    fn from_type() -> Self {
        Self {
            target: T::target,
            picked: |value| value.try_downcast_ref::<T>().map(T::picked),
            assign: |value, object| match value.try_downcast_mut::<T>() {
                Some(field) => {
                    field.assign(object);
                    true
                }
                None => false,
            },
        }
    }
}

impl PickField for Entity {
    fn target() -> PickTarget {
        PickTarget::Node
    }

    fn picked(&self) -> Option<PickedObject> {
        (*self != Entity::PLACEHOLDER).then(|| PickedObject::node(*self))
    }

    fn assign(&mut self, object: Option<PickedObject>) {
        *self = object.map_or(Entity::PLACEHOLDER, |object| object.entity);
    }
}

impl PickField for Option<Entity> {
    fn target() -> PickTarget {
        PickTarget::Node
    }

    fn picked(&self) -> Option<PickedObject> {
        self.map(PickedObject::node)
    }

    fn assign(&mut self, object: Option<PickedObject>) {
        *self = object.map(|object| object.entity);
    }
}

/// A reference to the `T` component of some entity.
#[derive(Reflect)]
#[reflect(Clone)]
pub struct ComponentRef<T: Component + TypePath> {
    pub entity: Option<Entity>,
    #[reflect(ignore)]
    marker: PhantomData<fn() -> T>,
}

impl<T: Component + TypePath> ComponentRef<T> {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity: Some(entity),
            marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Self {
            entity: None,
            marker: PhantomData,
        }
    }

    pub fn get<'w>(&self, world: &'w World) -> Option<&'w T> {
        self.entity.and_then(|entity| world.get::<T>(entity))
    }
}

impl<T: Component + TypePath> Default for ComponentRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Component + TypePath> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Component + TypePath> Copy for ComponentRef<T> {}

impl<T: Component + TypePath> PartialEq for ComponentRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<T: Component + TypePath> fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("component", &T::short_type_path())
            .field("entity", &self.entity)
            .finish()
    }
}

impl<T: Component + TypePath> PickField for ComponentRef<T> {
    fn target() -> PickTarget {
        PickTarget::Component {
            type_id: TypeId::of::<T>(),
            type_path: T::type_path(),
        }
    }

    fn picked(&self) -> Option<PickedObject> {
        self.entity
            .map(|entity| PickedObject::component(entity, TypeId::of::<T>()))
    }

    fn assign(&mut self, object: Option<PickedObject>) {
        self.entity = object.map(|object| object.entity);
    }
}

/// A contract implemented by several component types. Components opt in by
/// registering `Self::Data` as type data, e.g. `#[reflect(Aimable)]`.
pub trait Capability: TypePath + Send + Sync + 'static {
    type Data: TypeData;
}

/// A reference to whichever component of an entity provides capability `C`.
#[derive(Reflect)]
#[reflect(Clone)]
pub struct CapabilityRef<C: Capability> {
    pub entity: Option<Entity>,
    #[reflect(ignore)]
    implementor: Option<TypeId>,
    #[reflect(ignore)]
    marker: PhantomData<fn() -> C>,
}

impl<C: Capability> CapabilityRef<C> {
    pub fn new(entity: Entity, implementor: TypeId) -> Self {
        Self {
            entity: Some(entity),
            implementor: Some(implementor),
            marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Self {
            entity: None,
            implementor: None,
            marker: PhantomData,
        }
    }

    /// The component type that provided the capability when the reference was assigned.
    pub fn implementor(&self) -> Option<TypeId> {
        self.implementor
    }

    /// Capability type data of the referenced component, if it is still present.
    pub fn data<'r>(&self, world: &World, registry: &'r TypeRegistry) -> Option<&'r C::Data> {
        let entity = self.entity?;
        let implementor = self.implementor?;
        let registration = registry.get(implementor)?;
        let component_id = world.components().get_id(implementor)?;
        world
            .get_entity(entity)
            .ok()?
            .contains_id(component_id)
            .then(|| registration.data::<C::Data>())
            .flatten()
    }
}

impl<C: Capability> Default for CapabilityRef<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: Capability> Clone for CapabilityRef<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Capability> Copy for CapabilityRef<C> {}

impl<C: Capability> PartialEq for CapabilityRef<C> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.implementor == other.implementor
    }
}

impl<C: Capability> fmt::Debug for CapabilityRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRef")
            .field("capability", &C::short_type_path())
            .field("entity", &self.entity)
            .field("implementor", &self.implementor)
            .finish()
    }
}

impl<C: Capability> PickField for CapabilityRef<C> {
    fn target() -> PickTarget {
        PickTarget::Capability {
            data: TypeId::of::<C::Data>(),
            name: C::short_type_path(),
        }
    }

    fn picked(&self) -> Option<PickedObject> {
        self.entity.map(|entity| PickedObject {
            entity,
            component: self.implementor,
        })
    }

    fn assign(&mut self, object: Option<PickedObject>) {
        self.entity = object.map(|object| object.entity);
        self.implementor = object.and_then(|object| object.component);
    }
}

/// How a pickable field presents itself in the inspector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    /// The field itself holds one reference.
    Single(PickTarget),
    /// The field is a list or array whose elements are references.
    Collection(PickTarget),
}

impl FieldShape {
    pub fn target(&self) -> PickTarget {
        match self {
            FieldShape::Single(target) | FieldShape::Collection(target) => *target,
        }
    }
}

pub fn pick_target(registry: &TypeRegistry, type_id: TypeId) -> Option<PickTarget> {
    registry
        .get_type_data::<ReflectPickField>(type_id)
        .map(ReflectPickField::target)
}

/// Classify a field type, or `None` if it cannot be picked.
pub fn pick_shape(registry: &TypeRegistry, info: &TypeInfo) -> Option<FieldShape> {
    if let Some(target) = pick_target(registry, info.type_id()) {
        return Some(FieldShape::Single(target));
    }
    let item = match info {
        TypeInfo::List(list) => list.item_ty().id(),
        TypeInfo::Array(array) => array.item_ty().id(),
        _ => return None,
    };
    pick_target(registry, item).map(FieldShape::Collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::reflect::Typed;

    #[derive(Component, Reflect, Default)]
    struct Turret;

    #[derive(Clone)]
    struct ReflectAimable;

    #[derive(TypePath)]
    struct Aimable;

    impl Capability for Aimable {
        type Data = ReflectAimable;
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<Entity>();
        registry.register::<Option<Entity>>();
        registry.register::<ComponentRef<Turret>>();
        registry.register::<CapabilityRef<Aimable>>();
        registry.register_type_data::<Entity, ReflectPickField>();
        registry.register_type_data::<Option<Entity>, ReflectPickField>();
        registry.register_type_data::<ComponentRef<Turret>, ReflectPickField>();
        registry.register_type_data::<CapabilityRef<Aimable>, ReflectPickField>();
        registry
    }

    fn entity(index: u32) -> Entity {
        Entity::from_raw_u32(index).unwrap()
    }

    #[test]
    fn entity_placeholder_reads_as_empty() {
        let mut value = Entity::PLACEHOLDER;
        assert_eq!(value.picked(), None);
        value.assign(Some(PickedObject::node(entity(3))));
        assert_eq!(value, entity(3));
        value.assign(None);
        assert_eq!(value, Entity::PLACEHOLDER);
    }

    #[test]
    fn component_ref_reports_its_component() {
        let mut value = ComponentRef::<Turret>::empty();
        value.assign(Some(PickedObject::node(entity(4))));
        assert_eq!(
            value.picked(),
            Some(PickedObject::component(entity(4), TypeId::of::<Turret>()))
        );
    }

    #[test]
    fn capability_ref_keeps_implementor() {
        let mut value = CapabilityRef::<Aimable>::empty();
        value.assign(Some(PickedObject::component(entity(2), TypeId::of::<Turret>())));
        assert_eq!(value.implementor(), Some(TypeId::of::<Turret>()));
        assert_eq!(value.picked().and_then(|o| o.component), Some(TypeId::of::<Turret>()));
    }

    #[test]
    fn type_data_writes_through_erased_value() {
        let registry = registry();
        let data = registry
            .get_type_data::<ReflectPickField>(TypeId::of::<Option<Entity>>())
            .unwrap();
        let mut value: Option<Entity> = None;
        assert!(data.assign(&mut value, Some(PickedObject::node(entity(9)))));
        assert_eq!(value, Some(entity(9)));
        assert_eq!(data.picked(&value), Some(Some(PickedObject::node(entity(9)))));

        let mut wrong = 5_u32;
        assert!(!data.assign(&mut wrong, None));
        assert_eq!(data.picked(&wrong), None);
    }

    #[test]
    fn shapes_cover_single_collection_and_unpickable() {
        let registry = registry();
        assert_eq!(
            pick_shape(&registry, Entity::type_info()),
            Some(FieldShape::Single(PickTarget::Node))
        );
        assert!(matches!(
            pick_shape(&registry, <Vec<ComponentRef<Turret>>>::type_info()),
            Some(FieldShape::Collection(PickTarget::Component { type_id, .. }))
                if type_id == TypeId::of::<Turret>()
        ));
        assert!(matches!(
            pick_shape(&registry, <[CapabilityRef<Aimable>; 2]>::type_info()),
            Some(FieldShape::Collection(PickTarget::Capability { data, name: "Aimable" }))
                if data == TypeId::of::<ReflectAimable>()
        ));
        assert_eq!(pick_shape(&registry, f32::type_info()), None);
        assert_eq!(pick_shape(&registry, <Vec<f32>>::type_info()), None);
    }

    #[test]
    fn target_names_are_short() {
        assert_eq!(ComponentRef::<Turret>::target().type_name(), "Turret");
        assert_eq!(CapabilityRef::<Aimable>::target().type_name(), "Aimable");
        assert_eq!(Entity::target().type_name(), "Entity");
    }
}
