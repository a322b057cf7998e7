//! Members of a type and the body access they share.

use strum::Display;

use crate::{
    metadata::{
        method::{MethodAttributes, MethodBody, MethodImplAttributes},
        token::Token,
    },
    module::attributes::{EventAttributes, PropertyAttributes},
};

/// Name of instance constructors
pub const CTOR_NAME: &str = ".ctor";
/// Name of type initializers
pub const CCTOR_NAME: &str = ".cctor";

/// The kind of a member, as reported while stripping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemberKind {
    /// `.ctor` or `.cctor`
    Constructor,
    /// An ordinary method
    Method,
    /// A property and its accessors
    Property,
    /// An event and its accessors
    Event,
}

/// Capability of every member kind that may own one or more method bodies.
///
/// The stripper visits all member kinds through this one trait.
pub trait HasOptionalBody {
    /// The kind of this member
    fn kind(&self) -> MemberKind;

    /// The name of this member
    fn name(&self) -> &str;

    /// Call `visit` for every body this member owns, with the name of the method carrying it
    fn for_each_body_mut(&mut self, visit: &mut dyn FnMut(&str, &mut MethodBody));

    /// Number of bodies this member owns
    fn body_count(&self) -> usize;
}

/// A `MethodDef` row with its optional body
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// The MethodDef token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Implementation attributes
    pub impl_flags: MethodImplAttributes,
    /// The raw signature blob
    pub signature: Vec<u8>,
    /// Parameter names in sequence order (the return parameter is not included)
    pub params: Vec<String>,
    /// The IL body, `None` for abstract, runtime or native methods
    pub body: Option<MethodBody>,
}

impl Method {
    /// True for `.ctor` / `.cctor` methods flagged `SpecialName | RTSpecialName`
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        (self.name == CTOR_NAME || self.name == CCTOR_NAME)
            && self
                .flags
                .contains(MethodAttributes::SPECIAL_NAME | MethodAttributes::RTSPECIAL_NAME)
    }
}

impl HasOptionalBody for Method {
    fn kind(&self) -> MemberKind {
        if self.is_constructor() {
            MemberKind::Constructor
        } else {
            MemberKind::Method
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_body_mut(&mut self, visit: &mut dyn FnMut(&str, &mut MethodBody)) {
        if let Some(body) = self.body.as_mut() {
            visit(&self.name, body);
        }
    }

    fn body_count(&self) -> usize {
        usize::from(self.body.is_some())
    }
}

/// A property with its accessor methods
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The Property token
    pub token: Token,
    /// Property name
    pub name: String,
    /// Property attributes
    pub flags: PropertyAttributes,
    /// The raw property signature blob
    pub signature: Vec<u8>,
    /// `get_` accessor
    pub getter: Option<Method>,
    /// `set_` accessor
    pub setter: Option<Method>,
    /// Further accessors, `.other` in IL
    pub other: Vec<Method>,
}

impl Property {
    fn accessors_mut(&mut self) -> impl Iterator<Item = &mut Method> {
        self.getter
            .iter_mut()
            .chain(self.setter.iter_mut())
            .chain(self.other.iter_mut())
    }

    /// All accessors, getter and setter first
    pub fn accessors(&self) -> impl Iterator<Item = &Method> {
        self.getter
            .iter()
            .chain(self.setter.iter())
            .chain(self.other.iter())
    }
}

impl HasOptionalBody for Property {
    fn kind(&self) -> MemberKind {
        MemberKind::Property
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_body_mut(&mut self, visit: &mut dyn FnMut(&str, &mut MethodBody)) {
        for accessor in self.accessors_mut() {
            accessor.for_each_body_mut(visit);
        }
    }

    fn body_count(&self) -> usize {
        self.accessors().map(HasOptionalBody::body_count).sum()
    }
}

/// An event with its accessor methods
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The Event token
    pub token: Token,
    /// Event name
    pub name: String,
    /// Event attributes
    pub flags: EventAttributes,
    /// Raw `TypeDefOrRef` coded index of the delegate type
    pub event_type: u32,
    /// `add_` accessor
    pub add: Option<Method>,
    /// `remove_` accessor
    pub remove: Option<Method>,
    /// `raise_` accessor
    pub raise: Option<Method>,
    /// Further accessors, `.other` in IL
    pub other: Vec<Method>,
}

impl Event {
    fn accessors_mut(&mut self) -> impl Iterator<Item = &mut Method> {
        self.add
            .iter_mut()
            .chain(self.remove.iter_mut())
            .chain(self.raise.iter_mut())
            .chain(self.other.iter_mut())
    }

    /// All accessors in add, remove, raise, other order
    pub fn accessors(&self) -> impl Iterator<Item = &Method> {
        self.add
            .iter()
            .chain(self.remove.iter())
            .chain(self.raise.iter())
            .chain(self.other.iter())
    }
}

impl HasOptionalBody for Event {
    fn kind(&self) -> MemberKind {
        MemberKind::Event
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_body_mut(&mut self, visit: &mut dyn FnMut(&str, &mut MethodBody)) {
        for accessor in self.accessors_mut() {
            accessor.for_each_body_mut(visit);
        }
    }

    fn body_count(&self) -> usize {
        self.accessors().map(HasOptionalBody::body_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::method::decode_stream;

    fn method(name: &str, flags: u16, code: Option<&[u8]>) -> Method {
        Method {
            token: Token::new(0x0600_0001),
            name: name.to_string(),
            flags: MethodAttributes::from_bits_retain(flags),
            impl_flags: MethodImplAttributes::empty(),
            signature: vec![0x20, 0x00, 0x01],
            params: Vec::new(),
            body: code.map(|code| {
                let mut image = vec![((code.len() as u8) << 2) | 2];
                image.extend_from_slice(code);
                MethodBody::read(&image, 0x2000, 0).unwrap()
            }),
        }
    }

    #[test]
    fn constructor_detection() {
        assert!(method(".ctor", 0x1886, None).is_constructor());
        assert!(method(".cctor", 0x1891, None).is_constructor());
        assert!(!method(".ctor", 0x0086, None).is_constructor());
        assert!(!method("Ctor", 0x1886, None).is_constructor());
        assert_eq!(method(".ctor", 0x1886, None).kind(), MemberKind::Constructor);
    }

    #[test]
    fn property_visits_all_accessors() {
        let code: &[u8] = &[0x17, 0x26, 0x2A];
        let mut property = Property {
            token: Token::new(0x1700_0001),
            name: "Value".to_string(),
            flags: PropertyAttributes::empty(),
            signature: vec![0x28, 0x00, 0x08],
            getter: Some(method("get_Value", 0x0886, Some(code))),
            setter: Some(method("set_Value", 0x0886, None)),
            other: vec![method("reset_Value", 0x0886, Some(code))],
        };
        assert_eq!(property.body_count(), 2);

        let mut visited = Vec::new();
        property.for_each_body_mut(&mut |name, body| {
            visited.push(name.to_string());
            body.truncate();
        });

        assert_eq!(visited, ["get_Value", "reset_Value"]);
        assert!(property.accessors().all(|accessor| accessor
            .body
            .as_ref()
            .map_or(true, MethodBody::is_empty)));
        assert_eq!(decode_stream(code).unwrap().len(), 3);
    }
}
