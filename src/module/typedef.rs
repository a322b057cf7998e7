//! Type definitions and the nested type tree.

use crate::{
    metadata::token::Token,
    module::{
        attributes::TypeAttributes,
        members::{Event, HasOptionalBody, Method, Property},
    },
};

/// A type definition with its members and nested types.
///
/// Nested types are owned by their enclosing type, so the module holds a strict tree. The
/// tree can be arbitrarily deep; every walk over it uses an explicit stack.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// The TypeDef token
    pub token: Token,
    /// Type attributes
    pub flags: TypeAttributes,
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// `Namespace.Outer/Inner`
    pub full_name: String,
    /// `.ctor` and `.cctor` methods
    pub constructors: Vec<Method>,
    /// All other methods not owned by a property or event
    pub methods: Vec<Method>,
    /// Properties with their accessors
    pub properties: Vec<Property>,
    /// Events with their accessors
    pub events: Vec<Event>,
    /// Nested types in table order
    pub nested: Vec<TypeDef>,
}

impl TypeDef {
    /// All members: constructors, methods, properties, then events
    pub fn members(&self) -> impl Iterator<Item = &dyn HasOptionalBody> {
        self.constructors
            .iter()
            .map(|member| member as &dyn HasOptionalBody)
            .chain(self.methods.iter().map(|member| member as &dyn HasOptionalBody))
            .chain(self.properties.iter().map(|member| member as &dyn HasOptionalBody))
            .chain(self.events.iter().map(|member| member as &dyn HasOptionalBody))
    }

    /// Mutable access to all members, in the order of [`TypeDef::members`]
    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut dyn HasOptionalBody> {
        self.constructors
            .iter_mut()
            .map(|member| member as &mut dyn HasOptionalBody)
            .chain(
                self.methods
                    .iter_mut()
                    .map(|member| member as &mut dyn HasOptionalBody),
            )
            .chain(
                self.properties
                    .iter_mut()
                    .map(|member| member as &mut dyn HasOptionalBody),
            )
            .chain(
                self.events
                    .iter_mut()
                    .map(|member| member as &mut dyn HasOptionalBody),
            )
    }

    /// Every method of the type, accessors included, in member order
    pub fn all_methods(&self) -> impl Iterator<Item = &Method> {
        self.constructors
            .iter()
            .chain(self.methods.iter())
            .chain(self.properties.iter().flat_map(Property::accessors))
            .chain(self.events.iter().flat_map(Event::accessors))
    }

    /// Direct nested type by simple name
    #[must_use]
    pub fn find_nested(&self, name: &str) -> Option<&TypeDef> {
        self.nested.iter().find(|nested| nested.name == name)
    }

    /// This type and all types nested in it, pre-order
    #[must_use]
    pub fn descendants(&self) -> Vec<&TypeDef> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(current.nested.iter().rev());
        }
        result
    }
}
