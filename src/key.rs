//! Type identity used as the registry key

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque, comparable identity of a type.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried
/// along so errors and logs can say which type was involved. Unsized types
/// are accepted, which is how trait objects become keys:
///
/// ```rust
/// use construct::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let key = TypeKey::of::<dyn Greeter>();
/// assert_eq!(key, TypeKey::of::<dyn Greeter>());
/// assert_ne!(key, TypeKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying [`TypeId`].
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}
