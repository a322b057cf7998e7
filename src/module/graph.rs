//! Construction of the module graph from the decoded tables.
//!
//! The run-length encoded member lists of TypeDef, PropertyMap and EventMap are expanded (with
//! their `*Ptr` indirections), MethodSemantics moves accessors into their property or event and
//! NestedClass turns the flat TypeDef table into a tree. Every MethodDef row ends up owned by
//! exactly one member.

use std::collections::HashSet;

use crate::{
    file::{io::read_le, File},
    metadata::{
        method::{MethodAttributes, MethodBody, MethodImplAttributes, MethodSemanticsAttributes},
        streams::{Blob, Strings},
        tables::{
            AssemblyRaw, AssemblyRefRaw, CodedIndexType, EventMapRaw, EventRaw, ExportedTypeRaw,
            ManifestResourceRaw, MethodDefRaw, MethodSemanticsRaw, ModuleRaw, NestedClassRaw,
            ParamRaw, PropertyMapRaw, PropertyRaw, PtrRaw, TableId, TablesStream, TypeDefRaw,
            TypeRefRaw,
        },
        token::Token,
        Metadata,
    },
    module::{
        attributes::{
            EventAttributes, ManifestResourceAttributes, PropertyAttributes, TypeAttributes,
        },
        identity::{
            AssemblyIdentity, AssemblyReference, AssemblyVersion, ReferencedType,
        },
        members::{Event, Method, Property},
        resource::{Resource, ResourceLocation},
        typedef::TypeDef,
    },
    Result,
};

/// Everything the module graph consists of
pub(crate) struct Graph {
    pub name: String,
    pub mvid: uguid::Guid,
    pub assembly: Option<AssemblyIdentity>,
    pub types: Vec<TypeDef>,
    pub resources: Vec<Resource>,
    pub assembly_refs: Vec<AssemblyReference>,
    pub exported_types: Vec<ReferencedType>,
}

pub(crate) fn build(file: &File, metadata: &Metadata) -> Result<Graph> {
    let data = file.data();
    let strings = metadata.strings(data)?;
    let tables = &metadata.tables;

    let (name, mvid) = match tables.get::<ModuleRaw>(1) {
        Some(module) => {
            let mvid = match (module.mvid, metadata.guid(data)?) {
                (0, _) | (_, None) => uguid::Guid::ZERO,
                (index, Some(heap)) => heap.get(index as usize)?,
            };
            (strings.get(module.name as usize)?.to_string(), mvid)
        }
        None => return Err(malformed_error!("Module table is empty")),
    };

    let assembly = match tables.get::<AssemblyRaw>(1) {
        Some(row) => Some(AssemblyIdentity {
            name: strings.get(row.name as usize)?.to_string(),
            version: version(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: culture(&strings, row.culture)?,
        }),
        None => None,
    };

    let methods = read_methods(file, metadata, &strings)?;
    let types = build_types(tables, &strings, &metadata.blob(data)?, methods)?;

    Ok(Graph {
        name,
        mvid,
        assembly,
        types,
        resources: read_resources(data, metadata, &strings)?,
        assembly_refs: read_assembly_refs(tables, &strings)?,
        exported_types: read_exported_types(tables, &strings)?,
    })
}

fn version(major: u32, minor: u32, build: u32, revision: u32) -> AssemblyVersion {
    AssemblyVersion::new(major as u16, minor as u16, build as u16, revision as u16)
}

fn culture(strings: &Strings, index: u32) -> Result<Option<String>> {
    if index == 0 {
        return Ok(None);
    }

    let culture = strings.get(index as usize)?;
    Ok((!culture.is_empty()).then(|| culture.to_string()))
}

/// Expand a run-length encoded list column.
///
/// `starts` holds the list column of each owner row; the list of row `i` runs up to the start
/// of row `i + 1`, the last one to the end of the target. List entries are resolved through
/// `ptr` when that table has rows.
fn expand_lists(
    tables: &TablesStream,
    starts: &[u32],
    target: TableId,
    ptr: TableId,
) -> Result<Vec<Vec<u32>>> {
    let target_rows = tables.rows(target);
    let list_rows = if tables.rows(ptr) > 0 {
        tables.rows(ptr)
    } else {
        target_rows
    };

    let mut lists = Vec::with_capacity(starts.len());
    for (index, start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(list_rows + 1);
        let end = end.min(list_rows + 1);
        let start = (*start).min(list_rows + 1);

        if start == 0 {
            return Err(malformed_error!("{} list of row {} is null", target, index + 1));
        }
        if start > end {
            return Err(malformed_error!(
                "{} list of row {} runs backwards - {} > {}",
                target,
                index + 1,
                start,
                end
            ));
        }

        let mut list = Vec::with_capacity((end - start) as usize);
        for entry in start..end {
            let rid = PtrRaw::resolve(tables, ptr, entry);
            if rid == 0 || rid > target_rows {
                return Err(malformed_error!("Invalid {} list entry - {}", target, rid));
            }
            list.push(rid);
        }
        lists.push(list);
    }

    Ok(lists)
}

fn read_methods(
    file: &File,
    metadata: &Metadata,
    strings: &Strings,
) -> Result<Vec<Option<Method>>> {
    let tables = &metadata.tables;
    let data = file.data();
    if tables.rows(TableId::MethodDef) == 0 {
        return Ok(Vec::new());
    }

    let blob = metadata.blob(data)?;
    let rows: Vec<MethodDefRaw> = tables.iter::<MethodDefRaw>().collect();
    let starts: Vec<u32> = rows.iter().map(|row| row.param_list).collect();
    let params = expand_lists(tables, &starts, TableId::Param, TableId::ParamPtr)?;

    let mut methods = Vec::with_capacity(rows.len());
    for (row, param_rids) in rows.iter().zip(params) {
        let impl_flags = MethodImplAttributes::from_bits_retain(row.impl_flags as u16);

        let mut named = Vec::with_capacity(param_rids.len());
        for rid in param_rids {
            if let Some(param) = tables.get::<ParamRaw>(rid) {
                if param.sequence != 0 {
                    named.push((param.sequence, strings.get(param.name as usize)?.to_string()));
                }
            }
        }
        named.sort_by_key(|(sequence, _)| *sequence);

        let body = if row.rva != 0 && impl_flags.is_il() {
            let offset = file.rva_to_offset(row.rva as usize)?;
            Some(MethodBody::read(data, row.rva, offset)?)
        } else {
            None
        };

        methods.push(Some(Method {
            token: Token::from_parts(TableId::MethodDef, row.rid),
            name: strings.get(row.name as usize)?.to_string(),
            flags: MethodAttributes::from_bits_retain(row.flags as u16),
            impl_flags,
            signature: blob.get(row.signature as usize)?.to_vec(),
            params: named.into_iter().map(|(_, name)| name).collect(),
            body,
        }));
    }

    Ok(methods)
}

/// Owner (0-based TypeDef index) of every row of a property or event table
fn map_owners(
    tables: &TablesStream,
    parents: &[u32],
    starts: &[u32],
    target: TableId,
    ptr: TableId,
) -> Result<Vec<Option<usize>>> {
    let type_rows = tables.rows(TableId::TypeDef);
    let mut owners = vec![None; tables.rows(target) as usize];

    if parents.is_empty() {
        return Ok(owners);
    }

    let lists = expand_lists(tables, starts, target, ptr)?;
    for (parent, list) in parents.iter().zip(lists) {
        if *parent == 0 || *parent > type_rows {
            return Err(malformed_error!("Invalid {} map parent - {}", target, parent));
        }

        for rid in list {
            let owner = &mut owners[rid as usize - 1];
            if owner.is_some() {
                return Err(malformed_error!("{} row {} has two parents", target, rid));
            }
            *owner = Some(*parent as usize - 1);
        }
    }

    Ok(owners)
}

fn take_method(methods: &mut [Option<Method>], rid: u32) -> Result<Method> {
    match methods.get_mut(rid as usize - 1).and_then(Option::take) {
        Some(method) => Ok(method),
        None => Err(malformed_error!("MethodDef row {} is owned twice", rid)),
    }
}

fn build_types(
    tables: &TablesStream,
    strings: &Strings,
    blob: &Blob,
    mut methods: Vec<Option<Method>>,
) -> Result<Vec<TypeDef>> {
    let type_rows: Vec<TypeDefRaw> = tables.iter::<TypeDefRaw>().collect();
    let method_count = methods.len() as u32;

    // Properties and events, with their owning type
    let property_maps: Vec<PropertyMapRaw> = tables.iter::<PropertyMapRaw>().collect();
    let property_owners = map_owners(
        tables,
        &property_maps.iter().map(|row| row.parent).collect::<Vec<_>>(),
        &property_maps.iter().map(|row| row.property_list).collect::<Vec<_>>(),
        TableId::Property,
        TableId::PropertyPtr,
    )?;

    let event_maps: Vec<EventMapRaw> = tables.iter::<EventMapRaw>().collect();
    let event_owners = map_owners(
        tables,
        &event_maps.iter().map(|row| row.parent).collect::<Vec<_>>(),
        &event_maps.iter().map(|row| row.event_list).collect::<Vec<_>>(),
        TableId::Event,
        TableId::EventPtr,
    )?;

    let mut properties = Vec::with_capacity(property_owners.len());
    for row in tables.iter::<PropertyRaw>() {
        properties.push(Property {
            token: Token::from_parts(TableId::Property, row.rid),
            name: strings.get(row.name as usize)?.to_string(),
            flags: PropertyAttributes::from_bits_retain(row.flags as u16),
            signature: blob.get(row.signature as usize)?.to_vec(),
            getter: None,
            setter: None,
            other: Vec::new(),
        });
    }

    let mut events = Vec::with_capacity(event_owners.len());
    for row in tables.iter::<EventRaw>() {
        events.push(Event {
            token: Token::from_parts(TableId::Event, row.rid),
            name: strings.get(row.name as usize)?.to_string(),
            flags: EventAttributes::from_bits_retain(row.flags as u16),
            event_type: row.event_type,
            add: None,
            remove: None,
            raise: None,
            other: Vec::new(),
        });
    }

    // Accessors move into their property or event, first claim wins
    let mut claimed: HashSet<u32> = HashSet::new();
    for row in tables.iter::<MethodSemanticsRaw>() {
        if row.method == 0 || row.method > method_count {
            return Err(malformed_error!(
                "MethodSemantics row {} refers to invalid method {}",
                row.rid,
                row.method
            ));
        }

        let (table, target) = CodedIndexType::HasSemantics.decode(row.association)?;
        if target == 0 {
            continue;
        }

        let owned = match table {
            TableId::Property => property_owners.get(target as usize - 1).copied().flatten(),
            _ => event_owners.get(target as usize - 1).copied().flatten(),
        };
        if owned.is_none() || claimed.contains(&row.method) {
            continue;
        }

        let semantics = MethodSemanticsAttributes::from_bits_retain(row.semantics as u16);
        let method = take_method(&mut methods, row.method)?;
        claimed.insert(row.method);

        if table == TableId::Property {
            let property = &mut properties[target as usize - 1];
            if semantics == MethodSemanticsAttributes::GETTER && property.getter.is_none() {
                property.getter = Some(method);
            } else if semantics == MethodSemanticsAttributes::SETTER && property.setter.is_none()
            {
                property.setter = Some(method);
            } else {
                property.other.push(method);
            }
        } else {
            let event = &mut events[target as usize - 1];
            if semantics == MethodSemanticsAttributes::ADD_ON && event.add.is_none() {
                event.add = Some(method);
            } else if semantics == MethodSemanticsAttributes::REMOVE_ON && event.remove.is_none() {
                event.remove = Some(method);
            } else if semantics == MethodSemanticsAttributes::FIRE && event.raise.is_none() {
                event.raise = Some(method);
            } else {
                event.other.push(method);
            }
        }
    }

    // Plain types with their methods
    let method_lists = expand_lists(
        tables,
        &type_rows.iter().map(|row| row.method_list).collect::<Vec<_>>(),
        TableId::MethodDef,
        TableId::MethodPtr,
    )?;

    let mut types: Vec<TypeDef> = Vec::with_capacity(type_rows.len());
    for (row, method_list) in type_rows.iter().zip(method_lists) {
        let mut constructors = Vec::new();
        let mut plain = Vec::new();
        for rid in method_list {
            if claimed.contains(&rid) {
                continue;
            }

            let method = take_method(&mut methods, rid)?;
            if method.is_constructor() {
                constructors.push(method);
            } else {
                plain.push(method);
            }
        }

        let namespace = strings.get(row.type_namespace as usize)?.to_string();
        let name = strings.get(row.type_name as usize)?.to_string();
        types.push(TypeDef {
            token: Token::from_parts(TableId::TypeDef, row.rid),
            flags: TypeAttributes::from_bits_retain(row.flags),
            full_name: String::new(),
            namespace,
            name,
            constructors,
            methods: plain,
            properties: Vec::new(),
            events: Vec::new(),
            nested: Vec::new(),
        });
    }

    if let Some(index) = methods.iter().position(Option::is_some) {
        return Err(malformed_error!(
            "MethodDef row {} is not owned by any type",
            index + 1
        ));
    }

    for (property, owner) in properties.into_iter().zip(property_owners) {
        if let Some(owner) = owner {
            types[owner].properties.push(property);
        }
    }
    for (event, owner) in events.into_iter().zip(event_owners) {
        if let Some(owner) = owner {
            types[owner].events.push(event);
        }
    }

    nest(tables, types)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Fresh,
    Active,
    Done,
}

/// Arrange the flat type list into the NestedClass tree
fn nest(tables: &TablesStream, types: Vec<TypeDef>) -> Result<Vec<TypeDef>> {
    let count = types.len();
    let mut parent: Vec<Option<usize>> = vec![None; count];

    for row in tables.iter::<NestedClassRaw>() {
        let (nested, enclosing) = (row.nested_class as usize, row.enclosing_class as usize);
        if nested == 0 || nested > count || enclosing == 0 || enclosing > count {
            return Err(malformed_error!(
                "NestedClass row {} refers to a missing type - {} in {}",
                row.rid,
                nested,
                enclosing
            ));
        }
        if nested == enclosing {
            return Err(malformed_error!("Type {} is nested in itself", nested));
        }
        if parent[nested - 1].is_some() {
            return Err(malformed_error!("Type {} has two enclosing types", nested));
        }
        parent[nested - 1] = Some(enclosing - 1);
    }

    let mut state = vec![Visit::Fresh; count];
    for start in 0..count {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match state[index] {
                Visit::Done => break,
                Visit::Active => {
                    return Err(malformed_error!(
                        "NestedClass cycle through type {}",
                        index + 1
                    ))
                }
                Visit::Fresh => {
                    state[index] = Visit::Active;
                    path.push(index);
                    current = parent[index];
                }
            }
        }
        for index in path {
            state[index] = Visit::Done;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();
    for (index, enclosing) in parent.iter().enumerate() {
        match enclosing {
            Some(enclosing) => children[*enclosing].push(index),
            None => roots.push(index),
        }
    }

    let mut slots: Vec<Option<TypeDef>> = types.into_iter().map(Some).collect();

    // Pre-order walk assigns the qualified names, enclosing types first
    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<(usize, Option<String>)> =
        roots.iter().rev().map(|root| (*root, None)).collect();
    while let Some((index, enclosing_name)) = stack.pop() {
        order.push(index);
        let full_name = match (&mut slots[index], enclosing_name) {
            (Some(ty), Some(enclosing_name)) => {
                ty.full_name = format!("{enclosing_name}/{}", ty.name);
                ty.full_name.clone()
            }
            (Some(ty), None) => {
                ty.full_name = if ty.namespace.is_empty() {
                    ty.name.clone()
                } else {
                    format!("{}.{}", ty.namespace, ty.name)
                };
                ty.full_name.clone()
            }
            (None, _) => continue,
        };

        for child in children[index].iter().rev() {
            stack.push((*child, Some(full_name.clone())));
        }
    }

    // Reverse pre-order completes every nested type before its enclosing type
    for index in order.into_iter().rev() {
        let nested: Vec<TypeDef> = children[index]
            .iter()
            .filter_map(|child| slots[*child].take())
            .collect();
        if let Some(ty) = slots[index].as_mut() {
            ty.nested = nested;
        }
    }

    Ok(roots
        .into_iter()
        .filter_map(|root| slots[root].take())
        .collect())
}

fn read_resources(data: &[u8], metadata: &Metadata, strings: &Strings) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();

    for row in metadata.tables.iter::<ManifestResourceRaw>() {
        let (table, target) = CodedIndexType::Implementation.decode(row.implementation)?;
        let location = if target == 0 {
            let Some(range) = metadata.resources_range else {
                return Err(malformed_error!(
                    "Embedded resource {} without a resources directory",
                    row.rid
                ));
            };

            let start = row.offset as usize;
            if start + 4 > range.size {
                return Err(out_of_bounds_error!());
            }
            let size = read_le::<u32>(&data[range.offset + start..])?;
            if start + 4 + size as usize > range.size {
                return Err(malformed_error!(
                    "Resource {} runs past the resources directory",
                    row.rid
                ));
            }

            ResourceLocation::Embedded {
                offset: row.offset,
                size,
            }
        } else {
            ResourceLocation::Linked { table, row: target }
        };

        resources.push(Resource {
            rid: row.rid,
            name: strings.get(row.name as usize)?.to_string(),
            flags: ManifestResourceAttributes::from_bits_retain(row.flags),
            location,
        });
    }

    Ok(resources)
}

/// All AssemblyRef rows with the types resolved into them through TypeRef chains
fn read_assembly_refs(
    tables: &TablesStream,
    strings: &Strings,
) -> Result<Vec<AssemblyReference>> {
    let mut references = Vec::new();
    for row in tables.iter::<AssemblyRefRaw>() {
        references.push(AssemblyReference {
            rid: row.rid,
            name: strings.get(row.name as usize)?.to_string(),
            version: version(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            types: Vec::new(),
        });
    }

    let type_refs = tables.rows(TableId::TypeRef);
    for row in tables.iter::<TypeRefRaw>() {
        // Follow nested type references outwards to their resolution scope
        let mut outermost = row;
        let mut steps = 0;
        let scope = loop {
            let (table, target) = CodedIndexType::ResolutionScope.decode(outermost.resolution_scope)?;
            if table != TableId::TypeRef || target == 0 {
                break (table, target);
            }

            steps += 1;
            match tables.get::<TypeRefRaw>(target) {
                Some(enclosing) if steps <= type_refs => outermost = enclosing,
                _ => {
                    return Err(malformed_error!(
                        "TypeRef {} has an invalid resolution scope chain",
                        row.rid
                    ))
                }
            }
        };

        if let (TableId::AssemblyRef, target) = scope {
            let Some(reference) = references.get_mut((target as usize).wrapping_sub(1)) else {
                return Err(malformed_error!(
                    "TypeRef {} refers to missing AssemblyRef {}",
                    row.rid,
                    target
                ));
            };

            let referenced = ReferencedType {
                namespace: strings.get(outermost.type_namespace as usize)?.to_string(),
                name: strings.get(outermost.type_name as usize)?.to_string(),
            };
            if !reference.types.contains(&referenced) {
                reference.types.push(referenced);
            }
        }
    }

    Ok(references)
}

fn read_exported_types(tables: &TablesStream, strings: &Strings) -> Result<Vec<ReferencedType>> {
    tables
        .iter::<ExportedTypeRaw>()
        .map(|row| {
            Ok(ReferencedType {
                namespace: strings.get(row.type_namespace as usize)?.to_string(),
                name: strings.get(row.type_name as usize)?.to_string(),
            })
        })
        .collect()
}
