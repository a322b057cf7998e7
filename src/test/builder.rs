//! Synthetic .NET assemblies for tests.
//!
//! [`AssemblyBuilder`] lays out a minimal but complete PE32 image: DOS and NT headers, one
//! `.text` section holding the CLI header, the method bodies, the embedded resources and the
//! metadata (`#~`, `#Strings`, `#US`, `#GUID`, `#Blob`). All heap and table indices are 2 bytes
//! wide. The builder only uses `std`, so integration tests include this file directly.

#![allow(dead_code)]

use std::collections::HashMap;

/// RVA of the `.text` section
pub const TEXT_RVA: u32 = 0x2000;
/// File offset of the `.text` section
pub const TEXT_OFFSET: u32 = 0x200;

const FILE_ALIGNMENT: u32 = 0x200;
const SECTION_ALIGNMENT: u32 = 0x2000;
const CLI_HEADER_SIZE: usize = 72;

/// `ldarg.0; call 0x0A000001; nop; nop; ret`, 5 instructions
pub const CTOR_CODE: [u8; 9] = [0x02, 0x28, 0x01, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x2A];
/// `ldc.i4.1; pop; ret`, 3 instructions
pub const METHOD_CODE: [u8; 3] = [0x17, 0x26, 0x2A];
/// `nop; leave.s 3; pop; leave.s 0; ret`, protected by one catch clause
pub const TRY_CATCH_CODE: [u8; 7] = [0x00, 0xDE, 0x03, 0x26, 0xDE, 0x00, 0x2A];

const CTOR_FLAGS: u16 = 0x1886;
const CCTOR_FLAGS: u16 = 0x1891;
const METHOD_FLAGS: u16 = 0x0086;
const ABSTRACT_FLAGS: u16 = 0x05C6;
const ACCESSOR_FLAGS: u16 = 0x0886;

const SEMANTICS_SETTER: u16 = 0x01;
const SEMANTICS_GETTER: u16 = 0x02;
const SEMANTICS_OTHER: u16 = 0x04;
const SEMANTICS_ADD_ON: u16 = 0x08;
const SEMANTICS_REMOVE_ON: u16 = 0x10;
const SEMANTICS_FIRE: u16 = 0x20;

#[derive(Clone, Debug)]
enum BodySpec {
    Abstract,
    Tiny(Vec<u8>),
    Fat { code: Vec<u8>, handler: bool },
}

#[derive(Clone, Debug)]
struct MethodSpec {
    name: String,
    flags: u16,
    body: BodySpec,
    params: Vec<String>,
}

impl MethodSpec {
    fn new(name: &str, flags: u16, body: BodySpec) -> Self {
        MethodSpec {
            name: name.to_string(),
            flags,
            body,
            params: Vec::new(),
        }
    }

    fn accessor(name: String) -> Self {
        MethodSpec {
            name,
            flags: ACCESSOR_FLAGS,
            body: BodySpec::Tiny(METHOD_CODE.to_vec()),
            params: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct PropertySpec {
    name: String,
    other: bool,
}

/// Members and nested types of one class
#[derive(Clone, Debug)]
pub struct ClassBuilder {
    namespace: String,
    name: String,
    flags: u32,
    methods: Vec<MethodSpec>,
    properties: Vec<PropertySpec>,
    events: Vec<String>,
    nested: Vec<ClassBuilder>,
}

impl ClassBuilder {
    fn new(namespace: &str, name: &str, flags: u32) -> Self {
        ClassBuilder {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Instance constructor with the 5 instruction [`CTOR_CODE`] body
    #[must_use]
    pub fn ctor(mut self) -> Self {
        self.methods.push(MethodSpec::new(
            ".ctor",
            CTOR_FLAGS,
            BodySpec::Tiny(CTOR_CODE.to_vec()),
        ));
        self
    }

    /// Type initializer with the 3 instruction [`METHOD_CODE`] body
    #[must_use]
    pub fn static_ctor(mut self) -> Self {
        self.methods.push(MethodSpec::new(
            ".cctor",
            CCTOR_FLAGS,
            BodySpec::Tiny(METHOD_CODE.to_vec()),
        ));
        self
    }

    /// A method with the [`METHOD_CODE`] body, or an abstract one without a body
    #[must_use]
    pub fn method(mut self, name: &str, has_body: bool) -> Self {
        let method = if has_body {
            MethodSpec::new(name, METHOD_FLAGS, BodySpec::Tiny(METHOD_CODE.to_vec()))
        } else {
            MethodSpec::new(name, ABSTRACT_FLAGS, BodySpec::Abstract)
        };
        self.methods.push(method);
        self
    }

    /// A method with named `int32` parameters
    #[must_use]
    pub fn method_with_params(mut self, name: &str, params: &[&str]) -> Self {
        let mut method = MethodSpec::new(name, METHOD_FLAGS, BodySpec::Tiny(METHOD_CODE.to_vec()));
        method.params = params.iter().map(|param| (*param).to_string()).collect();
        self.methods.push(method);
        self
    }

    /// A method with arbitrary code, stored tiny when it fits
    #[must_use]
    pub fn method_with_code(mut self, name: &str, code: &[u8]) -> Self {
        let body = if code.len() < 64 {
            BodySpec::Tiny(code.to_vec())
        } else {
            BodySpec::Fat {
                code: code.to_vec(),
                handler: false,
            }
        };
        self.methods.push(MethodSpec::new(name, METHOD_FLAGS, body));
        self
    }

    /// A fat method running [`TRY_CATCH_CODE`] with one exception clause
    #[must_use]
    pub fn fat_method(mut self, name: &str) -> Self {
        self.methods.push(MethodSpec::new(
            name,
            METHOD_FLAGS,
            BodySpec::Fat {
                code: TRY_CATCH_CODE.to_vec(),
                handler: true,
            },
        ));
        self
    }

    /// A property with `get_` and `set_` accessors
    #[must_use]
    pub fn property(mut self, name: &str) -> Self {
        self.properties.push(PropertySpec {
            name: name.to_string(),
            other: false,
        });
        self
    }

    /// A property with `get_`, `set_` and one `other_` accessor
    #[must_use]
    pub fn property_with_other(mut self, name: &str) -> Self {
        self.properties.push(PropertySpec {
            name: name.to_string(),
            other: true,
        });
        self
    }

    /// An event with `add_`, `remove_`, `raise_` and one `other_` accessor
    #[must_use]
    pub fn event(mut self, name: &str) -> Self {
        self.events.push(name.to_string());
        self
    }

    /// A nested public class
    #[must_use]
    pub fn nested(mut self, name: &str, build: impl FnOnce(ClassBuilder) -> ClassBuilder) -> Self {
        self.nested
            .push(build(ClassBuilder::new("", name, 0x0010_0002)));
        self
    }
}

#[derive(Clone, Debug)]
struct ResourceSpec {
    name: String,
    data: Vec<u8>,
    attribute: bool,
}

#[derive(Clone, Debug)]
struct ReferenceSpec {
    name: String,
    types: Vec<(String, String)>,
}

/// Builder for a complete synthetic assembly image
#[derive(Clone, Debug)]
pub struct AssemblyBuilder {
    name: String,
    version: [u16; 4],
    types: Vec<ClassBuilder>,
    resources: Vec<ResourceSpec>,
    references: Vec<ReferenceSpec>,
    assembly_attribute: bool,
    type_attributes: Vec<u32>,
    extra_nested: Vec<(u32, u32)>,
}

impl AssemblyBuilder {
    /// An assembly named `name`, module `name.dll`, version 1.0.0.0
    #[must_use]
    pub fn new(name: &str) -> Self {
        AssemblyBuilder {
            name: name.to_string(),
            version: [1, 0, 0, 0],
            types: Vec::new(),
            resources: Vec::new(),
            references: Vec::new(),
            assembly_attribute: false,
            type_attributes: Vec::new(),
            extra_nested: Vec::new(),
        }
    }

    /// Set the assembly version
    #[must_use]
    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        self.version = [major, minor, build, revision];
        self
    }

    /// Add a public top-level class
    #[must_use]
    pub fn class(
        mut self,
        namespace: &str,
        name: &str,
        build: impl FnOnce(ClassBuilder) -> ClassBuilder,
    ) -> Self {
        self.types
            .push(build(ClassBuilder::new(namespace, name, 0x0010_0001)));
        self
    }

    /// Add an embedded resource
    #[must_use]
    pub fn resource(mut self, name: &str, data: &[u8]) -> Self {
        self.resources.push(ResourceSpec {
            name: name.to_string(),
            data: data.to_vec(),
            attribute: false,
        });
        self
    }

    /// Add an embedded resource carrying one custom attribute
    #[must_use]
    pub fn resource_with_attribute(mut self, name: &str, data: &[u8]) -> Self {
        self.resources.push(ResourceSpec {
            name: name.to_string(),
            data: data.to_vec(),
            attribute: true,
        });
        self
    }

    /// Put one custom attribute on the assembly
    #[must_use]
    pub fn assembly_attribute(mut self) -> Self {
        self.assembly_attribute = true;
        self
    }

    /// Put one custom attribute on the TypeDef row `rid` (`<Module>` is row 1)
    #[must_use]
    pub fn type_attribute(mut self, rid: u32) -> Self {
        self.type_attributes.push(rid);
        self
    }

    /// Reference assembly `name` and the given types of it. A type name `Outer/Inner`
    /// produces a chain of nested type references.
    #[must_use]
    pub fn reference(mut self, name: &str, types: &[(&str, &str)]) -> Self {
        self.references.push(ReferenceSpec {
            name: name.to_string(),
            types: types
                .iter()
                .map(|(namespace, name)| ((*namespace).to_string(), (*name).to_string()))
                .collect(),
        });
        self
    }

    /// Add a raw `NestedClass` row between TypeDef rows (`<Module>` is row 1)
    #[must_use]
    pub fn nested_class_row(mut self, nested: u32, enclosing: u32) -> Self {
        self.extra_nested.push((nested, enclosing));
        self
    }

    /// Produce the image bytes
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut types = Vec::new();
        for class in &self.types {
            flatten(class, None, &mut types);
        }

        let mut strings = Heap::strings();
        let mut blobs = Heap::blobs();
        let mut tables = Tables::default();

        // .text starts with the CLI header, bodies follow
        let mut text = vec![0u8; CLI_HEADER_SIZE];

        // Module
        let module = tables.row(0x00);
        put16(module, 0);
        put16(module, strings.add(&format!("{}.dll", self.name)));
        put16(module, 1);
        put16(module, 0);
        put16(module, 0);

        // TypeRef
        for (index, reference) in self.references.iter().enumerate() {
            let assembly_ref = index as u32 + 1;
            for (namespace, name) in &reference.types {
                let mut scope = (assembly_ref << 2) | 2;
                for (depth, part) in name.split('/').enumerate() {
                    let row = tables.row(0x01);
                    put16(row, scope as u16);
                    put16(row, strings.add(part));
                    put16(row, if depth == 0 { strings.add(namespace) } else { 0 });
                    scope = (tables.rows(0x01) << 2) | 3;
                }
            }
        }

        // TypeDef `<Module>`
        let row = tables.row(0x02);
        put32(row, 0);
        put16(row, strings.add("<Module>"));
        put16(row, 0);
        put16(row, 0);
        put16(row, 1);
        put16(row, 1);

        let mut method_rid = 1u32;
        let mut param_rid = 1u32;
        let mut property_rid = 1u32;
        let mut event_rid = 1u32;
        let mut semantics: Vec<(u16, u32, u32)> = Vec::new();
        let mut nested_rows: Vec<(u32, u32)> = Vec::new();

        for (index, (class, enclosing)) in types.iter().enumerate() {
            let type_rid = index as u32 + 2;
            if let Some(enclosing) = enclosing {
                nested_rows.push((type_rid, *enclosing as u32 + 2));
            }

            let row = tables.row(0x02);
            put32(row, class.flags);
            put16(row, strings.add(&class.name));
            put16(row, strings.add(&class.namespace));
            put16(row, 0);
            put16(row, 1);
            put16(row, method_rid as u16);

            let mut methods: Vec<MethodSpec> = class.methods.clone();
            let mut property_rows = Vec::new();
            for property in &class.properties {
                let getter = method_rid + methods.len() as u32;
                methods.push(MethodSpec::accessor(format!("get_{}", property.name)));
                methods.push(MethodSpec::accessor(format!("set_{}", property.name)));
                semantics.push((SEMANTICS_GETTER, getter, (property_rid << 1) | 1));
                semantics.push((SEMANTICS_SETTER, getter + 1, (property_rid << 1) | 1));
                if property.other {
                    methods.push(MethodSpec::accessor(format!("other_{}", property.name)));
                    semantics.push((SEMANTICS_OTHER, getter + 2, (property_rid << 1) | 1));
                }
                property_rows.push(property.name.clone());
                property_rid += 1;
            }

            let mut event_rows = Vec::new();
            for event in &class.events {
                let add = method_rid + methods.len() as u32;
                for prefix in ["add_", "remove_", "raise_", "other_"] {
                    methods.push(MethodSpec::accessor(format!("{prefix}{event}")));
                }
                semantics.push((SEMANTICS_ADD_ON, add, event_rid << 1));
                semantics.push((SEMANTICS_REMOVE_ON, add + 1, event_rid << 1));
                semantics.push((SEMANTICS_FIRE, add + 2, event_rid << 1));
                semantics.push((SEMANTICS_OTHER, add + 3, event_rid << 1));
                event_rows.push(event.clone());
                event_rid += 1;
            }

            if !property_rows.is_empty() {
                let row = tables.row(0x15);
                put16(row, type_rid as u16);
                put16(row, (property_rid - property_rows.len() as u32) as u16);
                for name in &property_rows {
                    let row = tables.row(0x17);
                    put16(row, 0);
                    put16(row, strings.add(name));
                    put16(row, blobs.add([0x28u8, 0x00, 0x08]));
                }
            }

            if !event_rows.is_empty() {
                let row = tables.row(0x12);
                put16(row, type_rid as u16);
                put16(row, (event_rid - event_rows.len() as u32) as u16);
                for name in &event_rows {
                    let row = tables.row(0x14);
                    put16(row, 0);
                    put16(row, strings.add(name));
                    put16(row, 0);
                }
            }

            for method in &methods {
                let rva = encode_body(&method.body, &mut text);

                let mut signature = vec![
                    if method.flags & 0x0010 != 0 { 0x00 } else { 0x20 },
                    method.params.len() as u8,
                    0x01,
                ];
                signature.extend(std::iter::repeat(0x08).take(method.params.len()));

                let row = tables.row(0x06);
                put32(row, rva);
                put16(row, 0);
                put16(row, method.flags);
                put16(row, strings.add(&method.name));
                put16(row, blobs.add(&signature));
                put16(row, param_rid as u16);

                for (sequence, param) in method.params.iter().enumerate() {
                    let row = tables.row(0x08);
                    put16(row, 0);
                    put16(row, sequence as u16 + 1);
                    put16(row, strings.add(param));
                    param_rid += 1;
                }
                method_rid += 1;
            }
        }

        // CustomAttribute, sorted by parent
        let attribute_value = blobs.add([0x01u8, 0x00, 0x00, 0x00]);
        let mut attributes: Vec<u32> = Vec::new();
        if self.assembly_attribute {
            attributes.push((1 << 5) | 14);
        }
        for rid in &self.type_attributes {
            attributes.push((rid << 5) | 3);
        }
        for (index, resource) in self.resources.iter().enumerate() {
            if resource.attribute {
                attributes.push(((index as u32 + 1) << 5) | 18);
            }
        }
        attributes.sort_unstable();
        for parent in attributes {
            let row = tables.row(0x0C);
            put16(row, parent as u16);
            put16(row, (1 << 3) | 2);
            put16(row, attribute_value);
        }

        semantics.sort_by_key(|(_, _, association)| *association);
        for (semantic, method, association) in semantics {
            let row = tables.row(0x18);
            put16(row, semantic);
            put16(row, method as u16);
            put16(row, association as u16);
        }

        // Assembly
        let row = tables.row(0x20);
        put32(row, 0x8004);
        for part in self.version {
            put16(row, part);
        }
        put32(row, 0);
        put16(row, 0);
        put16(row, strings.add(&self.name));
        put16(row, 0);

        // AssemblyRef
        for reference in &self.references {
            let row = tables.row(0x23);
            put16(row, 1);
            put16(row, 0);
            put16(row, 0);
            put16(row, 0);
            put32(row, 0);
            put16(row, 0);
            put16(row, strings.add(&reference.name));
            put16(row, 0);
            put16(row, 0);
        }

        // Embedded resources
        let mut resources_rva = 0;
        let mut resources_size = 0;
        if !self.resources.is_empty() {
            align(&mut text, 8);
            let start = text.len();
            for resource in &self.resources {
                align(&mut text, 8);
                let offset = (text.len() - start) as u32;
                text.extend_from_slice(&(resource.data.len() as u32).to_le_bytes());
                text.extend_from_slice(&resource.data);

                let row = tables.row(0x28);
                put32(row, offset);
                put32(row, 0x0001);
                put16(row, strings.add(&resource.name));
                put16(row, 0);
            }
            resources_rva = TEXT_RVA + start as u32;
            resources_size = (text.len() - start) as u32;
        }

        // NestedClass, sorted by nested type
        nested_rows.extend(self.extra_nested.iter().copied());
        nested_rows.sort_by_key(|(nested, _)| *nested);
        for (nested, enclosing) in nested_rows {
            let row = tables.row(0x29);
            put16(row, nested as u16);
            put16(row, enclosing as u16);
        }

        // Metadata root and streams
        align(&mut text, 4);
        let root_start = text.len();
        let metadata = metadata_root(
            tables.encode(),
            strings.finish(),
            mvid(&self.name),
            blobs.finish(),
        );
        text.extend_from_slice(&metadata);

        let mut header = Vec::with_capacity(CLI_HEADER_SIZE);
        put32(&mut header, CLI_HEADER_SIZE as u32);
        put16(&mut header, 2);
        put16(&mut header, 5);
        put32(&mut header, TEXT_RVA + root_start as u32);
        put32(&mut header, metadata.len() as u32);
        put32(&mut header, 0x0001);
        put32(&mut header, 0);
        put32(&mut header, resources_rva);
        put32(&mut header, resources_size);
        header.resize(CLI_HEADER_SIZE, 0);
        text[..CLI_HEADER_SIZE].copy_from_slice(&header);

        pe_image(text)
    }
}

fn flatten<'a>(
    class: &'a ClassBuilder,
    enclosing: Option<usize>,
    types: &mut Vec<(&'a ClassBuilder, Option<usize>)>,
) {
    let index = types.len();
    types.push((class, enclosing));
    for nested in &class.nested {
        flatten(nested, Some(index), types);
    }
}

/// Append the body to `text` and return its RVA, 0 for abstract methods
fn encode_body(body: &BodySpec, text: &mut Vec<u8>) -> u32 {
    match body {
        BodySpec::Abstract => 0,
        BodySpec::Tiny(code) => {
            align(text, 4);
            let rva = TEXT_RVA + text.len() as u32;
            text.push(((code.len() as u8) << 2) | 0x2);
            text.extend_from_slice(code);
            rva
        }
        BodySpec::Fat { code, handler } => {
            align(text, 4);
            let rva = TEXT_RVA + text.len() as u32;
            let flags: u16 = if *handler { 0x301B } else { 0x3013 };
            put16(text, flags);
            put16(text, 2);
            put32(text, code.len() as u32);
            put32(text, 0);
            text.extend_from_slice(code);

            if *handler {
                align(text, 4);
                text.extend_from_slice(&[0x01, 0x10, 0x00, 0x00]);
                put16(text, 0);
                put16(text, 0);
                text.push(3);
                put16(text, 3);
                text.push(3);
                put32(text, 0x0100_0001);
            }
            rva
        }
    }
}

fn metadata_root(tables: Vec<u8>, strings: Vec<u8>, guid: [u8; 16], blobs: Vec<u8>) -> Vec<u8> {
    let user_strings = vec![0u8; 4];
    let streams: [(&str, Vec<u8>); 5] = [
        ("#~", tables),
        ("#Strings", strings),
        ("#US", user_strings),
        ("#GUID", guid.to_vec()),
        ("#Blob", blobs),
    ];

    let version = b"v4.0.30319\0\0";
    let headers_len: usize = streams
        .iter()
        .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
        .sum();

    let mut out = Vec::new();
    put32(&mut out, 0x424A_5342);
    put16(&mut out, 1);
    put16(&mut out, 1);
    put32(&mut out, 0);
    put32(&mut out, version.len() as u32);
    out.extend_from_slice(version);
    put16(&mut out, 0);
    put16(&mut out, streams.len() as u16);

    let mut offset = out.len() + headers_len;
    for (name, data) in &streams {
        put32(&mut out, offset as u32);
        put32(&mut out, data.len() as u32);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        align(&mut out, 4);
        offset += data.len();
    }

    for (_, data) in &streams {
        out.extend_from_slice(data);
    }
    out
}

fn pe_image(mut text: Vec<u8>) -> Vec<u8> {
    let virtual_size = text.len() as u32;
    let raw_size = align_to(virtual_size, FILE_ALIGNMENT);
    text.resize(raw_size as usize, 0);

    let mut image = vec![0u8; 0x80];
    image[0] = b'M';
    image[1] = b'Z';
    image[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());

    image.extend_from_slice(b"PE\0\0");

    // COFF header
    put16(&mut image, 0x014C);
    put16(&mut image, 1);
    put32(&mut image, 0);
    put32(&mut image, 0);
    put32(&mut image, 0);
    put16(&mut image, 224);
    put16(&mut image, 0x2102);

    // Optional header, PE32
    put16(&mut image, 0x010B);
    image.push(8);
    image.push(0);
    put32(&mut image, raw_size);
    put32(&mut image, 0);
    put32(&mut image, 0);
    put32(&mut image, 0);
    put32(&mut image, TEXT_RVA);
    put32(&mut image, TEXT_RVA + align_to(virtual_size, SECTION_ALIGNMENT));
    put32(&mut image, 0x0040_0000);
    put32(&mut image, SECTION_ALIGNMENT);
    put32(&mut image, FILE_ALIGNMENT);
    put16(&mut image, 4);
    put16(&mut image, 0);
    put16(&mut image, 0);
    put16(&mut image, 0);
    put16(&mut image, 4);
    put16(&mut image, 0);
    put32(&mut image, 0);
    put32(&mut image, TEXT_RVA + align_to(virtual_size, SECTION_ALIGNMENT));
    put32(&mut image, TEXT_OFFSET);
    put32(&mut image, 0);
    put16(&mut image, 3);
    put16(&mut image, 0x8540);
    put32(&mut image, 0x0010_0000);
    put32(&mut image, 0x1000);
    put32(&mut image, 0x0010_0000);
    put32(&mut image, 0x1000);
    put32(&mut image, 0);
    put32(&mut image, 16);
    for directory in 0..16 {
        if directory == 14 {
            put32(&mut image, TEXT_RVA);
            put32(&mut image, CLI_HEADER_SIZE as u32);
        } else {
            put32(&mut image, 0);
            put32(&mut image, 0);
        }
    }

    // Section table
    image.extend_from_slice(b".text\0\0\0");
    put32(&mut image, virtual_size);
    put32(&mut image, TEXT_RVA);
    put32(&mut image, raw_size);
    put32(&mut image, TEXT_OFFSET);
    put32(&mut image, 0);
    put32(&mut image, 0);
    put16(&mut image, 0);
    put16(&mut image, 0);
    put32(&mut image, 0x6000_0020);

    image.resize(TEXT_OFFSET as usize, 0);
    image.extend_from_slice(&text);
    image
}

fn mvid(name: &str) -> [u8; 16] {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }

    let mut guid = [0u8; 16];
    guid[..8].copy_from_slice(&hash.to_le_bytes());
    guid[8..].copy_from_slice(&hash.rotate_left(29).to_le_bytes());
    guid
}

/// An interning heap: `#Strings` (null terminated) or `#Blob` (length prefixed)
struct Heap {
    data: Vec<u8>,
    known: HashMap<Vec<u8>, u16>,
    blob: bool,
}

impl Heap {
    fn strings() -> Self {
        Heap {
            data: vec![0],
            known: HashMap::new(),
            blob: false,
        }
    }

    fn blobs() -> Self {
        Heap {
            data: vec![0],
            known: HashMap::new(),
            blob: true,
        }
    }

    fn add(&mut self, value: impl AsRef<[u8]>) -> u16 {
        let value = value.as_ref();
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.known.get(value) {
            return *index;
        }

        let index = self.data.len() as u16;
        if self.blob {
            self.data.push(value.len() as u8);
            self.data.extend_from_slice(value);
        } else {
            self.data.extend_from_slice(value);
            self.data.push(0);
        }
        self.known.insert(value.to_vec(), index);
        index
    }

    fn finish(mut self) -> Vec<u8> {
        align(&mut self.data, 4);
        self.data
    }
}

#[derive(Default)]
struct Tables {
    rows: HashMap<u8, (u32, Vec<u8>)>,
}

impl Tables {
    fn row(&mut self, table: u8) -> &mut Vec<u8> {
        let entry = self.rows.entry(table).or_default();
        entry.0 += 1;
        &mut entry.1
    }

    fn rows(&self, table: u8) -> u32 {
        self.rows.get(&table).map_or(0, |(rows, _)| *rows)
    }

    fn encode(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.rows.keys().copied().collect();
        ids.sort_unstable();

        let valid = ids.iter().fold(0u64, |mask, id| mask | (1 << id));

        let mut out = Vec::new();
        put32(&mut out, 0);
        out.push(2);
        out.push(0);
        out.push(0);
        out.push(1);
        out.extend_from_slice(&valid.to_le_bytes());
        out.extend_from_slice(&0x0000_1600_3301_FA00u64.to_le_bytes());
        for id in &ids {
            put32(&mut out, self.rows[id].0);
        }
        for id in &ids {
            out.extend_from_slice(&self.rows[id].1);
        }
        align(&mut out, 4);
        out
    }
}

fn put16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn align(out: &mut Vec<u8>, alignment: usize) {
    while out.len() % alignment != 0 {
        out.push(0);
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
