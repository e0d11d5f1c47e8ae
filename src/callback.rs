//! Change notifications for pickable fields.
//!
//! A field names its callback with `#[reflect(@PickCallback::new("name"))]`.
//! Callbacks are plain functions registered per owner type with
//! [`PickerAppExt::register_pick_callback`](crate::PickerAppExt::register_pick_callback).
//! The owner is the value that declares the field; if it has no callback of
//! that name, each enclosing value out to the component itself is tried.

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bevy::{
    ecs::reflect::AppTypeRegistry,
    prelude::*,
    reflect::{TypePath, TypeRegistry},
};

use crate::{
    error::{CallbackError, CastError},
    field::{FieldHandle, describe_picked, with_component_mut},
    pick_field::{Capability, CapabilityRef, ComponentRef, PickedObject},
    property_path::PropertyPath,
};

/// Field attribute naming the callback fired when the field is picked or edited.
#[derive(Reflect, Clone, Debug, PartialEq, Eq)]
pub struct PickCallback(Cow<'static, str>);

impl PickCallback {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A callback parameter type. Narrowing fails instead of coercing when the
/// picked object is not a valid value of `Self`.
pub trait PickParam: Sized + Send + 'static {
    fn narrow(world: &World, picked: Option<PickedObject>) -> Result<Self, CastError>;
}

fn cast_error<T>(world: &World, expected: &'static str, picked: Option<PickedObject>) -> Result<T, CastError> {
    Err(CastError {
        expected,
        found: describe_picked(world, picked),
    })
}

/// An empty value narrows to [`Entity::PLACEHOLDER`], the same encoding an
/// `Entity` field uses for "nothing picked".
impl PickParam for Entity {
    fn narrow(_world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        Ok(picked.map_or(Entity::PLACEHOLDER, |picked| picked.entity))
    }
}

impl PickParam for Option<Entity> {
    fn narrow(_world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        Ok(picked.map(|picked| picked.entity))
    }
}

impl PickParam for PickedObject {
    fn narrow(_world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        Ok(picked.unwrap_or(PickedObject::node(Entity::PLACEHOLDER)))
    }
}

impl PickParam for Option<PickedObject> {
    fn narrow(_world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        Ok(picked)
    }
}

impl<T: Component + TypePath> PickParam for ComponentRef<T> {
    fn narrow(world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        let Some(object) = picked else {
            return Ok(ComponentRef::empty());
        };
        let same_component = object
            .component
            .is_none_or(|component| component == TypeId::of::<T>());
        if same_component && world.get::<T>(object.entity).is_some() {
            Ok(ComponentRef::new(object.entity))
        } else {
            cast_error(world, T::type_path(), picked)
        }
    }
}

impl<C: Capability> PickParam for CapabilityRef<C> {
    fn narrow(world: &World, picked: Option<PickedObject>) -> Result<Self, CastError> {
        let Some(object) = picked else {
            return Ok(CapabilityRef::empty());
        };
        let registry = world.resource::<AppTypeRegistry>().read();
        let implementor = match object.component {
            Some(component) => {
                provides::<C>(&registry, world, object.entity, component).then_some(component)
            }
            None => world.inspect_entity(object.entity).ok().and_then(|mut components| {
                components.find_map(|info| {
                    info.type_id()
                        .filter(|&type_id| provides::<C>(&registry, world, object.entity, type_id))
                })
            }),
        };
        match implementor {
            Some(implementor) => Ok(CapabilityRef::new(object.entity, implementor)),
            None => cast_error(world, C::type_path(), picked),
        }
    }
}

fn provides<C: Capability>(
    registry: &TypeRegistry,
    world: &World,
    entity: Entity,
    component: TypeId,
) -> bool {
    let has_data = registry
        .get(component)
        .is_some_and(|registration| registration.data::<C::Data>().is_some());
    let present = world
        .components()
        .get_id(component)
        .zip(world.get_entity(entity).ok())
        .is_some_and(|(id, entity)| entity.contains_id(id));
    has_data && present
}

/// A callback with its parameters already narrowed, waiting for its owner.
/// Returns `false` if the owner is not of the registered type.
pub type BoundCall = Box<dyn FnOnce(&mut dyn PartialReflect) -> bool>;

type BindFn = dyn Fn(&World, Option<PickedObject>, Option<PickedObject>) -> Result<BoundCall, CastError>
    + Send
    + Sync;

pub struct CallbackMethod {
    arity: usize,
    owner_type: TypeId,
    owner: &'static str,
    bind: Option<Box<BindFn>>,
}

impl CallbackMethod {
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }
}

pub trait IntoPickCallback<Owner, Marker>: Send + Sync + 'static {
    fn into_method(self) -> CallbackMethod;
}

impl<Owner, F> IntoPickCallback<Owner, ()> for F
where
    Owner: Reflect + TypePath,
    F: Fn(&mut Owner) + Send + Sync + 'static,
{
    fn into_method(self) -> CallbackMethod {
        let f = Arc::new(self);
        let bind: Box<BindFn> = Box::new(
            move |_: &World, _: Option<PickedObject>, _: Option<PickedObject>| -> Result<BoundCall, CastError> {
                let f = f.clone();
                let call: BoundCall = Box::new(move |owner: &mut dyn PartialReflect| {
                    owner.try_downcast_mut::<Owner>().map(|owner| (*f)(owner)).is_some()
                });
                Ok(call)
            },
        );
        CallbackMethod {
            arity: 0,
            owner_type: TypeId::of::<Owner>(),
            owner: Owner::type_path(),
            bind: Some(bind),
        }
    }
}

/// Single-parameter callbacks register, but are never invoked.
impl<Owner, P, F> IntoPickCallback<Owner, (P,)> for F
where
    Owner: Reflect + TypePath,
    P: PickParam,
    F: Fn(&mut Owner, P) + Send + Sync + 'static,
{
    fn into_method(self) -> CallbackMethod {
        CallbackMethod {
            arity: 1,
            owner_type: TypeId::of::<Owner>(),
            owner: Owner::type_path(),
            bind: None,
        }
    }
}

impl<Owner, P, Q, F> IntoPickCallback<Owner, (P, Q)> for F
where
    Owner: Reflect + TypePath,
    P: PickParam,
    Q: PickParam,
    F: Fn(&mut Owner, P, Q) + Send + Sync + 'static,
{
    fn into_method(self) -> CallbackMethod {
        let f = Arc::new(self);
        let bind: Box<BindFn> = Box::new(
            move |world: &World,
                  previous: Option<PickedObject>,
                  current: Option<PickedObject>|
                  -> Result<BoundCall, CastError> {
                let previous = P::narrow(world, previous)?;
                let current = Q::narrow(world, current)?;
                let f = f.clone();
                let call: BoundCall = Box::new(move |owner: &mut dyn PartialReflect| {
                    owner
                        .try_downcast_mut::<Owner>()
                        .map(|owner| (*f)(owner, previous, current))
                        .is_some()
                });
                Ok(call)
            },
        );
        CallbackMethod {
            arity: 2,
            owner_type: TypeId::of::<Owner>(),
            owner: Owner::type_path(),
            bind: Some(bind),
        }
    }
}

/// Registered callbacks, keyed by owner type and name.
#[derive(Resource, Default)]
pub struct PickCallbacks {
    methods: HashMap<TypeId, HashMap<String, Arc<CallbackMethod>>>,
    reported: HashSet<(TypeId, String)>,
}

impl PickCallbacks {
    pub fn register<Owner, M>(&mut self, name: impl Into<String>, callback: impl IntoPickCallback<Owner, M>)
    where
        Owner: Reflect + TypePath,
    {
        self.methods
            .entry(TypeId::of::<Owner>())
            .or_default()
            .insert(name.into(), Arc::new(callback.into_method()));
    }

    pub fn contains<Owner: 'static>(&self, name: &str) -> bool {
        self.methods
            .get(&TypeId::of::<Owner>())
            .is_some_and(|methods| methods.contains_key(name))
    }
}

pub fn find_callback_method(
    callbacks: &PickCallbacks,
    owner: TypeId,
    name: &str,
) -> Option<Arc<CallbackMethod>> {
    callbacks.methods.get(&owner)?.get(name).cloned()
}

/// Find `name` on the value owning the field at `path`, then on each
/// enclosing value. Returns the path of the value that has it.
fn locate_callback(
    callbacks: &PickCallbacks,
    component: &dyn PartialReflect,
    path: &PropertyPath,
    name: &str,
) -> Result<(PropertyPath, Arc<CallbackMethod>), CallbackError> {
    let mut owner_type = None;
    for enclosing in path.enclosing_paths() {
        let Some(info) = enclosing.resolve(component)?.get_represented_type_info() else {
            continue;
        };
        owner_type.get_or_insert(info.type_path());
        if let Some(method) = find_callback_method(callbacks, info.type_id(), name) {
            return Ok((enclosing, method));
        }
    }
    Err(CallbackError::NotFound {
        name: name.to_string(),
        owner: owner_type.unwrap_or("<dynamic>").to_string(),
    })
}

/// Invoke callback `name` for `field` with the previous and current values.
pub fn fire_field_callback(
    world: &mut World,
    field: &FieldHandle,
    name: &str,
    previous: Option<PickedObject>,
    current: Option<PickedObject>,
) -> Result<(), CallbackError> {
    let (owner_path, method) = {
        let callbacks = world.resource::<PickCallbacks>();
        field.inspect_component(world, |_, component| {
            locate_callback(callbacks, component, &field.path, name)
        })?
    };
    let Some(bind) = method.bind.as_ref() else {
        return Err(CallbackError::UnsupportedArity {
            name: name.to_string(),
            arity: method.arity,
            owner: method.owner_type,
            owner_path: method.owner,
        });
    };
    let call = bind(world, previous, current)?;
    with_component_mut(world, field.entity, field.component, |component| {
        let owner = owner_path.resolve_mut(component)?;
        let found = owner.reflect_type_path().to_string();
        if call(owner) {
            Ok(())
        } else {
            Err(CallbackError::OwnerMismatch {
                name: name.to_string(),
                expected: method.owner,
                found,
            })
        }
    })
}

/// Log a callback failure. Arity problems are configuration errors and are
/// reported once per owner type and callback name.
pub fn report_callback_error(
    callbacks: &mut PickCallbacks,
    field: &FieldHandle,
    name: &str,
    error: &CallbackError,
) {
    match error {
        CallbackError::UnsupportedArity { owner, .. } => {
            if callbacks.reported.insert((*owner, name.to_string())) {
                error!("{error} (field `{}` on {})", field.path, field.entity);
            }
        }
        _ => warn!(
            "Failed to invoke pick callback `{name}` on {} at `{}`: {error}",
            field.entity, field.path
        ),
    }
}

/// Fire the field's declared callback, if any, logging failures.
pub fn dispatch_field_callback(
    world: &mut World,
    field: &FieldHandle,
    previous: Option<PickedObject>,
    current: Option<PickedObject>,
) {
    let name = match field.callback_name(world) {
        Ok(Some(name)) => name,
        Ok(None) => return,
        Err(err) => {
            warn!("Failed to read pick callback of `{}` on {}: {err}", field.path, field.entity);
            return;
        }
    };
    dispatch_named_callback(world, field, &name, previous, current);
}

pub(crate) fn dispatch_named_callback(
    world: &mut World,
    field: &FieldHandle,
    name: &str,
    previous: Option<PickedObject>,
    current: Option<PickedObject>,
) {
    if let Err(err) = fire_field_callback(world, field, name, previous, current) {
        report_callback_error(&mut world.resource_mut::<PickCallbacks>(), field, name, &err);
    }
}
