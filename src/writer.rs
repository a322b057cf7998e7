//! Serializing a stripped [`Module`] back into a PE image.
//!
//! The output starts as a copy of the original image and only three areas are patched, so
//! everything else (headers, heaps, signatures, the strong name blob) stays byte-identical:
//!
//! 1. **Method bodies** are re-encoded from the model and written at their original RVA. The
//!    rest of the old extent is zero-filled. A body that encodes to exactly its old bytes is
//!    not touched.
//! 2. **Tables**: `ManifestResource` rows that are no longer part of the module are dropped,
//!    together with the custom attributes they own. The remaining rows are renumbered and the
//!    `HasCustomAttribute` indices pointing at them remapped, keeping the attribute table sorted
//!    by parent. The stream is re-encoded in place and padded with zeros to its original size.
//! 3. **Resources**: payloads of dropped embedded resources are zero-filled. Without any
//!    embedded resource left, the resources directory of the CLI header is cleared.
//!
//! The image layout never moves: nothing may grow beyond the space it had.

use std::{collections::HashMap, fs, path::Path};

use crate::{
    error::WriteError,
    file::io::write_le_at,
    metadata::{
        cor20header::COR20_RESOURCES_OFFSET,
        method::MethodBody,
        tables::{CodedIndexType, CustomAttributeRaw, RawRow, TableId, TablesStream},
        token::Token,
    },
    module::{Module, ResourceLocation},
    Result,
};

/// Serialize `module` and write it to `path`, replacing an existing file.
///
/// # Errors
/// Returns [`WriteError::BodyOverflow`] if a body outgrew its original extent,
/// [`WriteError::Encoding`] if the metadata can't be re-encoded and [`WriteError::IoFailure`]
/// if the file can't be written.
pub fn write(module: &Module, path: &Path) -> std::result::Result<(), WriteError> {
    let image = to_bytes(module)?;
    fs::write(path, image).map_err(|source| WriteError::IoFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `module` into a new image buffer.
///
/// # Errors
/// See [`write`], without the I/O failure.
pub fn to_bytes(module: &Module) -> std::result::Result<Vec<u8>, WriteError> {
    let mut image = module.data().to_vec();

    write_bodies(module, &mut image)?;
    write_tables(module, &mut image)?;
    write_resources(module, &mut image)?;

    Ok(image)
}

fn write_bodies(module: &Module, image: &mut [u8]) -> std::result::Result<(), WriteError> {
    for method in module.all_methods() {
        let Some(body) = &method.body else {
            continue;
        };
        write_body(method.token, body, image)?;
    }

    Ok(())
}

fn write_body(
    token: Token,
    body: &MethodBody,
    image: &mut [u8],
) -> std::result::Result<(), WriteError> {
    let extent = body.extent;
    let encoded = body.encode()?;
    if encoded.len() > extent.size {
        return Err(WriteError::BodyOverflow {
            token,
            available: extent.size,
            required: encoded.len(),
        });
    }

    let Some(target) = image.get_mut(extent.offset..extent.offset + extent.size) else {
        return Err(WriteError::Encoding(out_of_bounds_error!()));
    };
    if *target == *encoded {
        return Ok(());
    }

    target[..encoded.len()].copy_from_slice(&encoded);
    target[encoded.len()..].fill(0);
    Ok(())
}

fn write_tables(module: &Module, image: &mut [u8]) -> std::result::Result<(), WriteError> {
    let metadata = module.metadata();
    let mut tables = metadata.tables.clone();
    if !drop_resources(module, &mut tables)? {
        return Ok(());
    }

    let encoded = tables.encode()?;
    let range = metadata.tables_range;
    if encoded.len() > range.size {
        return Err(WriteError::Encoding(malformed_error!(
            "Tables stream grew from {} to {} bytes",
            range.size,
            encoded.len()
        )));
    }

    let Some(target) = image.get_mut(range.offset..range.offset + range.size) else {
        return Err(WriteError::Encoding(out_of_bounds_error!()));
    };
    target[..encoded.len()].copy_from_slice(&encoded);
    target[encoded.len()..].fill(0);
    Ok(())
}

/// Remove the `ManifestResource` rows the module no longer has. Returns false if there are
/// none to remove.
fn drop_resources(module: &Module, tables: &mut TablesStream) -> Result<bool> {
    let kept: Vec<u32> = module.resources.iter().map(|resource| resource.rid).collect();
    let row_count = tables.rows(TableId::ManifestResource);

    // old rid -> new rid, for the rows that survive
    let mut remap: HashMap<u32, u32> = HashMap::new();
    for rid in 1..=row_count {
        if kept.contains(&rid) {
            remap.insert(rid, remap.len() as u32 + 1);
        }
    }
    if remap.len() == row_count as usize {
        return Ok(false);
    }

    tables
        .table_mut(TableId::ManifestResource)
        .retain_rows(|rid, _| remap.contains_key(&rid));

    let parent_kind = CodedIndexType::HasCustomAttribute;
    let mut parents = Vec::with_capacity(tables.rows(CustomAttributeRaw::TABLE) as usize);
    for attribute in tables.iter::<CustomAttributeRaw>() {
        parents.push(parent_kind.decode(attribute.parent)?);
    }

    tables
        .table_mut(CustomAttributeRaw::TABLE)
        .retain_rows(|rid, _| match parents[rid as usize - 1] {
            (TableId::ManifestResource, row) => remap.contains_key(&row),
            _ => true,
        });

    let attributes = tables.table_mut(CustomAttributeRaw::TABLE);
    for rid in 1..=attributes.row_count() {
        let Some(row) = attributes.row_mut(rid) else {
            break;
        };
        if let (TableId::ManifestResource, old) = parent_kind.decode(row[0])? {
            if let Some(&new) = remap.get(&old) {
                row[0] = parent_kind.encode(TableId::ManifestResource, new)?;
            }
        }
    }
    // renumbered resources may now sort before other parents
    attributes.sort_rows_by_key(|row| row[0]);

    Ok(true)
}

fn write_resources(module: &Module, image: &mut [u8]) -> std::result::Result<(), WriteError> {
    let metadata = module.metadata();
    let Some(directory) = metadata.resources_range else {
        return Ok(());
    };

    for resource in module.loaded_resources() {
        let ResourceLocation::Embedded { offset, size } = resource.location else {
            continue;
        };
        if module.resources.iter().any(|kept| kept.rid == resource.rid) {
            continue;
        }

        let start = directory.offset + offset as usize;
        let end = start + 4 + size as usize;
        let Some(payload) = image.get_mut(start..end) else {
            return Err(WriteError::Encoding(out_of_bounds_error!()));
        };
        payload.fill(0);
    }

    if !module.resources.iter().any(|resource| resource.is_embedded()) {
        let mut offset = metadata.cor20_offset + COR20_RESOURCES_OFFSET;
        write_le_at::<u32>(image, &mut offset, 0)?;
        write_le_at::<u32>(image, &mut offset, 0)?;
    }

    Ok(())
}
