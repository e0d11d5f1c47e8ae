use std::any::TypeId;

use bevy::prelude::Entity;

/// A field path (or the entity/component it starts from) could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("`{type_path}` has no field named `{field}`")]
    MissingField { type_path: String, field: String },
    #[error("index segment `{segment}` does not contain an integer")]
    InvalidIndex { segment: String },
    #[error("index {index} is out of bounds for `{type_path}` of length {len}")]
    IndexOutOfBounds {
        type_path: String,
        index: usize,
        len: usize,
    },
    #[error("`{type_path}` is not a list or array and cannot be indexed")]
    NotACollection { type_path: String },
    #[error("`{type_path}` has no named fields (looking up `{field}`)")]
    NotAStruct { type_path: String, field: String },
    #[error("element marker `{marker}` is not followed by an index segment")]
    MissingIndex { marker: String },
    #[error("entity {0} does not exist")]
    MissingEntity(Entity),
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent { entity: Entity, component: String },
    #[error("type `{0}` is not registered for reflection")]
    Unregistered(String),
    #[error("{0}")]
    Path(String),
    #[error("value at `{path}` is not a pickable reference")]
    NotPickable { path: String },
}

/// A picked value is not assignable to the parameter type a callback declares.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot cast {found} to `{expected}`")]
pub struct CastError {
    pub expected: &'static str,
    pub found: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("no callback named `{name}` on `{owner}` or any enclosing value")]
    NotFound { name: String, owner: String },
    #[error("callback `{name}` on `{owner_path}` takes {arity} parameter(s); only 0 or 2 are supported")]
    UnsupportedArity {
        name: String,
        arity: usize,
        owner: TypeId,
        owner_path: &'static str,
    },
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("callback `{name}` was registered for `{expected}` but the owner is `{found}`")]
    OwnerMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("no field is being picked")]
    NotPicking,
}
