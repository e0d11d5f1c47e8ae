//! Typed field paths over reflected values.
//!
//! A [`PropertyPath`] is parsed once from its textual form and then walked
//! against live reflected data as often as needed. Two textual forms are
//! accepted and may be mixed:
//!
//! - serialized: `connections.Array.data[0].to`
//! - compact: `connections[0].to`
//!
//! Index text is reduced to its ASCII digits before parsing, so `data[12]`,
//! `[12]` and `12` all name element 12.

use std::{borrow::Cow, fmt};

use bevy::reflect::{
    Access, AccessErrorKind, ParsedPath, PartialReflect, ReflectPath, ReflectPathError, ReflectRef,
};

use crate::error::ResolutionError;

/// Segment that announces an element index in the serialized form.
pub const ELEMENT_MARKER: &str = "Array";

/// A field path lowered to reflect accesses once, at parse time.
///
/// Named fields become [`Access::Field`], numeric field names (tuple, tuple
/// struct and tuple variant positions) become [`Access::TupleIndex`] and
/// element indices become [`Access::ListIndex`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    accesses: ParsedPath,
}

impl Default for PropertyPath {
    fn default() -> Self {
        Self::root()
    }
}

impl PropertyPath {
    /// The empty path, addressing the root value itself.
    pub fn root() -> Self {
        Self {
            accesses: ParsedPath(Vec::new()),
        }
    }

    pub fn parse(path: &str) -> Result<Self, ResolutionError> {
        let raw: Vec<&str> = path.split('.').collect();
        let mut parsed = Self::root();
        let mut i = 0;
        while i < raw.len() {
            let segment = raw[i];
            if segment.is_empty() {
                i += 1;
                continue;
            }
            if segment == ELEMENT_MARKER {
                let Some(index_segment) = raw.get(i + 1) else {
                    return Err(ResolutionError::MissingIndex {
                        marker: segment.to_string(),
                    });
                };
                parsed = parsed.index(parse_index(index_segment)?);
                i += 2;
                continue;
            }
            match segment.find('[') {
                Some(open) => {
                    let name = &segment[..open];
                    if !name.is_empty() {
                        parsed = parsed.field(name);
                    }
                    for group in segment[open..].split_inclusive(']') {
                        parsed = parsed.index(parse_index(group)?);
                    }
                }
                None => parsed = parsed.field(segment),
            }
            i += 1;
        }
        Ok(parsed)
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        match name.parse::<usize>() {
            Ok(position) => self.push(Access::TupleIndex(position)),
            Err(_) => self.push(Access::Field(Cow::Owned(name))),
        }
    }

    pub fn index(self, index: usize) -> Self {
        self.push(Access::ListIndex(index))
    }

    fn push(mut self, access: Access<'static>) -> Self {
        self.accesses.0.push(access.into());
        self
    }

    fn truncated(&self, len: usize) -> Self {
        Self {
            accesses: ParsedPath(self.accesses.0[..len].to_vec()),
        }
    }

    pub fn accesses(&self) -> impl DoubleEndedIterator<Item = &Access<'static>> {
        self.accesses.0.iter().map(|offset_access| &offset_access.access)
    }

    pub fn is_root(&self) -> bool {
        self.accesses.0.is_empty()
    }

    /// The last field access of the path, ignoring trailing element indices.
    pub fn last_field(&self) -> Option<&Access<'static>> {
        self.accesses()
            .rev()
            .find(|access| !matches!(access, Access::ListIndex(_)))
    }

    /// Path of the value that declares the leaf field: trailing indices and the
    /// last field are removed. `a.b.Array.data[2]` and `a.b` both yield `a`.
    pub fn owner_path(&self) -> Self {
        let trailing = self
            .accesses()
            .rev()
            .take_while(|access| matches!(access, Access::ListIndex(_)))
            .count();
        let len = self.accesses.0.len() - trailing;
        self.truncated(len.saturating_sub(1))
    }

    /// The owner path followed by every shorter prefix, ending with the root.
    pub fn enclosing_paths(&self) -> Vec<Self> {
        let owner = self.owner_path();
        (0..=owner.accesses.0.len())
            .rev()
            .map(|len| owner.truncated(len))
            .collect()
    }

    pub fn resolve<'r>(
        &self,
        root: &'r dyn PartialReflect,
    ) -> Result<&'r dyn PartialReflect, ResolutionError> {
        (&self.accesses)
            .reflect_element(root)
            .map_err(|err| self.resolution_error(root, err))
    }

    pub fn resolve_mut<'r>(
        &self,
        root: &'r mut dyn PartialReflect,
    ) -> Result<&'r mut dyn PartialReflect, ResolutionError> {
        // Failures are explained against the shared borrow.
        self.resolve(&*root)?;
        (&self.accesses)
            .reflect_element_mut(root)
            .map_err(|err| ResolutionError::Path(err.to_string()))
    }

    /// Translate a failed access into the error naming the value it failed on.
    fn resolution_error(&self, root: &dyn PartialReflect, err: ReflectPathError) -> ResolutionError {
        let access_error = match err {
            ReflectPathError::InvalidAccess(access_error) => access_error,
            other => return ResolutionError::Path(other.to_string()),
        };
        let base = (0..self.accesses.0.len())
            .rev()
            .find_map(|len| (&self.truncated(len).accesses).reflect_element(root).ok())
            .unwrap_or(root);
        let type_path = type_path_of(base).to_string();
        let access = access_error.access();
        match (access_error.kind(), access) {
            (AccessErrorKind::MissingField(_), &Access::ListIndex(index)) => {
                let len = match base.reflect_ref() {
                    ReflectRef::List(list) => list.len(),
                    ReflectRef::Array(array) => array.len(),
                    _ => 0,
                };
                ResolutionError::IndexOutOfBounds {
                    type_path,
                    index,
                    len,
                }
            }
            (_, Access::ListIndex(_)) => ResolutionError::NotACollection { type_path },
            (AccessErrorKind::MissingField(_), _) => ResolutionError::MissingField {
                type_path,
                field: access.display_value().to_string(),
            },
            (_, _) => ResolutionError::NotAStruct {
                type_path,
                field: access.display_value().to_string(),
            },
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, access) in self.accesses().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match access {
                Access::ListIndex(index) => write!(f, "{ELEMENT_MARKER}.data[{index}]")?,
                other => write!(f, "{}", other.display_value())?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for PropertyPath {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Walk from `root` to the value owning the field addressed by `path`.
pub fn resolve_parent_object<'r>(
    root: &'r dyn PartialReflect,
    path: &PropertyPath,
) -> Result<&'r dyn PartialReflect, ResolutionError> {
    path.owner_path().resolve(root)
}

fn parse_index(segment: &str) -> Result<usize, ResolutionError> {
    let digits: String = segment.chars().filter(char::is_ascii_digit).collect();
    digits.parse().map_err(|_| ResolutionError::InvalidIndex {
        segment: segment.to_string(),
    })
}

fn type_path_of(value: &dyn PartialReflect) -> &'static str {
    value
        .get_represented_type_info()
        .map_or("<dynamic>", |info| info.type_path())
}
