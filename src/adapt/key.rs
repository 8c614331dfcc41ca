use std::any::{TypeId, type_name};
use std::borrow::Cow;
use std::fmt;

/// Role used when a binding does not name one.
pub const DEFAULT_ROLE: &str = "default";

/// `(type, role)` key of an adapter binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    type_id: TypeId,
    type_name: &'static str,
    role: Cow<'static, str>,
}

impl AdapterKey {
    pub fn of<A: 'static>() -> Self {
        Self::with_role::<A>(DEFAULT_ROLE)
    }

    pub fn with_role<A: 'static>(role: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
            role: role.into(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn is<A: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<A>()
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdapterKey({}, {})", self.type_name, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hover;
    struct Select;

    #[test]
    fn same_type_distinct_roles_are_distinct_keys() {
        assert_ne!(
            AdapterKey::with_role::<Hover>("primary"),
            AdapterKey::with_role::<Hover>("secondary")
        );
        assert_eq!(AdapterKey::of::<Hover>(), AdapterKey::with_role::<Hover>(DEFAULT_ROLE));
    }

    #[test]
    fn same_role_distinct_types_are_distinct_keys() {
        let hover = AdapterKey::of::<Hover>();
        assert_ne!(hover, AdapterKey::of::<Select>());
        assert!(hover.is::<Hover>());
        assert!(hover.to_string().ends_with("Hover, default)"));
    }
}
