use std::any::TypeId;

use bevy::{
    ecs::reflect::{AppTypeRegistry, ReflectComponent},
    prelude::*,
    reflect::{Access, ReflectRef, TypeInfo, TypeRegistry},
};

use crate::{
    callback::PickCallback,
    error::{PickError, ResolutionError},
    pick_field::{FieldShape, PickedObject, ReflectPickField, pick_shape},
    property_path::PropertyPath,
};

/// Addresses one field of one component on one entity.
///
/// The path is parsed once when the handle is built; every read and write
/// resolves it again against the live component, so the handle never holds a
/// stale copy of the data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    pub entity: Entity,
    pub component: TypeId,
    pub path: PropertyPath,
}

/// Result of writing a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub previous: Option<PickedObject>,
    pub current: Option<PickedObject>,
}

impl FieldChange {
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

impl FieldHandle {
    pub fn new<C: Component>(entity: Entity, path: PropertyPath) -> Self {
        Self {
            entity,
            component: TypeId::of::<C>(),
            path,
        }
    }

    pub fn parse<C: Component>(entity: Entity, path: &str) -> Result<Self, ResolutionError> {
        Ok(Self::new::<C>(entity, PropertyPath::parse(path)?))
    }

    /// Handle to element `index` of a collection field.
    pub fn element(&self, index: usize) -> Self {
        Self {
            entity: self.entity,
            component: self.component,
            path: self.path.clone().index(index),
        }
    }

    /// Read the reference currently stored in the field.
    pub fn read(&self, world: &World) -> Result<Option<PickedObject>, ResolutionError> {
        self.inspect(world, |registry, value| {
            let data = pick_field_data(registry, value, &self.path)?;
            data.picked(value).ok_or_else(|| not_pickable(&self.path))
        })
    }

    pub fn shape(&self, world: &World) -> Result<Option<FieldShape>, ResolutionError> {
        self.inspect(world, |registry, value| {
            Ok(value
                .get_represented_type_info()
                .and_then(|info| pick_shape(registry, info)))
        })
    }

    /// Number of elements, or `None` if the field is not a list or array.
    pub fn element_count(&self, world: &World) -> Result<Option<usize>, ResolutionError> {
        self.inspect(world, |_, value| {
            Ok(match value.reflect_ref() {
                ReflectRef::List(list) => Some(list.len()),
                ReflectRef::Array(array) => Some(array.len()),
                _ => None,
            })
        })
    }

    /// Name given by a `#[reflect(@PickCallback::new(..))]` attribute on the
    /// field declaration. For a collection element the attribute of the
    /// collection field applies.
    pub fn callback_name(&self, world: &World) -> Result<Option<String>, ResolutionError> {
        let Some(field) = self.path.last_field() else {
            return Ok(None);
        };
        let owner_path = self.path.owner_path();
        self.inspect(world, |_, component| {
            let owner = owner_path.resolve(component)?;
            let Some(info) = owner.get_represented_type_info() else {
                return Ok(None);
            };
            let attribute = match (info, field) {
                (TypeInfo::Struct(info), Access::Field(name)) => info
                    .field(name)
                    .and_then(|field| field.get_attribute::<PickCallback>()),
                (TypeInfo::TupleStruct(info), &Access::TupleIndex(index)) => info
                    .field_at(index)
                    .and_then(|field| field.get_attribute::<PickCallback>()),
                _ => None,
            };
            Ok(attribute.map(|callback| callback.name().to_string()))
        })
    }

    /// Write `object` into the field, re-reading the live component first.
    pub fn assign(
        &self,
        world: &mut World,
        object: Option<PickedObject>,
    ) -> Result<FieldChange, PickError> {
        let registry = world.resource::<AppTypeRegistry>().clone();
        let path = &self.path;
        with_component_mut(world, self.entity, self.component, |component| {
            let registry = registry.read();
            let field = path.resolve_mut(component)?;
            let data = pick_field_data(&registry, field, path)?;
            let previous = data.picked(field).ok_or_else(|| not_pickable(path))?;
            if !data.assign(field, object) {
                return Err(not_pickable(path).into());
            }
            let current = data.picked(field).flatten();
            Ok(FieldChange { previous, current })
        })
    }

    fn inspect<R>(
        &self,
        world: &World,
        f: impl FnOnce(&TypeRegistry, &dyn PartialReflect) -> Result<R, ResolutionError>,
    ) -> Result<R, ResolutionError> {
        self.inspect_component(world, |registry, component| {
            f(registry, self.path.resolve(component)?)
        })
    }

    /// Run `f` against the whole component the field lives in.
    pub(crate) fn inspect_component<R, E>(
        &self,
        world: &World,
        f: impl FnOnce(&TypeRegistry, &dyn PartialReflect) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<ResolutionError>,
    {
        let registry = world.resource::<AppTypeRegistry>().read();
        let reflect_component = reflect_component(&registry, self.component)?;
        let entity = world
            .get_entity(self.entity)
            .map_err(|_| ResolutionError::MissingEntity(self.entity))?;
        let Some(component) = reflect_component.reflect(entity) else {
            return Err(missing_component(&registry, self.entity, self.component).into());
        };
        f(&registry, component.as_partial_reflect())
    }
}

/// Run `f` against a mutable reflection of `component` on `entity`. The
/// component is marked changed only if `f` succeeds.
pub(crate) fn with_component_mut<R, E>(
    world: &mut World,
    entity: Entity,
    component: TypeId,
    f: impl FnOnce(&mut dyn PartialReflect) -> Result<R, E>,
) -> Result<R, E>
where
    E: From<ResolutionError>,
{
    let registry = world.resource::<AppTypeRegistry>().clone();
    let registry = registry.read();
    let reflect_component = reflect_component(&registry, component)?;
    let missing = missing_component(&registry, entity, component);
    let entity_mut = world
        .get_entity_mut(entity)
        .map_err(|_| ResolutionError::MissingEntity(entity))?;
    let Some(mut reflected) = reflect_component.reflect_mut(entity_mut) else {
        return Err(missing.into());
    };
    let result = f(reflected
        .bypass_change_detection()
        .as_partial_reflect_mut())?;
    reflected.set_changed();
    Ok(result)
}

fn reflect_component(
    registry: &TypeRegistry,
    component: TypeId,
) -> Result<&ReflectComponent, ResolutionError> {
    registry
        .get_type_data::<ReflectComponent>(component)
        .ok_or_else(|| ResolutionError::Unregistered(format!("{component:?}")))
}

fn missing_component(registry: &TypeRegistry, entity: Entity, component: TypeId) -> ResolutionError {
    ResolutionError::MissingComponent {
        entity,
        component: registry
            .get(component)
            .map_or_else(|| format!("{component:?}"), |r| r.type_info().type_path().to_string()),
    }
}

fn not_pickable(path: &PropertyPath) -> ResolutionError {
    ResolutionError::NotPickable {
        path: path.to_string(),
    }
}

fn pick_field_data<'r>(
    registry: &'r TypeRegistry,
    value: &dyn PartialReflect,
    path: &PropertyPath,
) -> Result<&'r ReflectPickField, ResolutionError> {
    value
        .get_represented_type_info()
        .and_then(|info| registry.get_type_data::<ReflectPickField>(info.type_id()))
        .ok_or_else(|| not_pickable(path))
}

/// Short human readable description of a reference, e.g. `Turret (Aim Target)`.
pub fn describe_picked(world: &World, picked: Option<PickedObject>) -> String {
    let Some(picked) = picked else {
        return "None".to_string();
    };
    let name = world
        .get::<Name>(picked.entity)
        .map_or_else(|| format!("{}", picked.entity), |name| name.as_str().to_string());
    let component = picked.component.and_then(|type_id| {
        let registry = world.resource::<AppTypeRegistry>().read();
        registry
            .get(type_id)
            .map(|registration| registration.type_info().type_path_table().short_path().to_string())
    });
    match component {
        Some(component) => format!("{name} ({component})"),
        None => name,
    }
}
