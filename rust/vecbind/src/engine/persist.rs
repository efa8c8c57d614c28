//! Encoding of a [`GraphState`] into the on-disk format and back.

use super::graph::{GraphState, Node, MAX_LEVEL};
use crate::buffer::Scalar;
use crate::distance::MetricKind;
use crate::serialization::{
    read_i64, read_u32, read_u64, read_u8, write_i64, write_u32, write_u64, write_u8, CountingWriter,
    GraphHeader, SerializationError, SerializationResult, DATA_ALIGNMENT,
};
use crate::types::{IdType, INVALID_ID};
use std::io::Write;
use std::ops::Range;

/// Smallest possible encoded node: label, level and one empty link list.
const MIN_NODE_BYTES: usize = 8 + 1 + 4;

pub(crate) fn write_graph<S: Scalar, W: Write>(
    writer: &mut CountingWriter<W>,
    header: &GraphHeader,
    state: &GraphState<S>,
) -> SerializationResult<()> {
    header.write(writer)?;

    for node in &state.nodes {
        write_i64(writer, node.label)?;
        write_u8(writer, node.level() as u8)?;
        for links in node.levels() {
            write_u32(writer, links.len() as u32)?;
            for &id in links {
                write_u32(writer, id)?;
            }
        }
    }

    for &offset in state.store.offsets() {
        write_u64(writer, offset as u64)?;
    }

    writer.pad_to(DATA_ALIGNMENT)?;
    writer.write_all(bytemuck::cast_slice(state.store.scalars()))?;
    writer.flush()?;
    Ok(())
}

/// A parsed file, minus the scalars, which stay where they are in `bytes`.
pub(crate) struct DecodedGraph {
    pub nodes: Vec<Node>,
    pub offsets: Vec<usize>,
    pub entry_point: IdType,
    pub max_level: usize,
    /// Byte range of the scalar region.
    pub data: Range<usize>,
}

fn corrupt(message: impl Into<String>) -> SerializationError {
    SerializationError::DataCorruption(message.into())
}

/// Parse and validate a whole file image for an engine storing `S` under
/// `metric` with the given dimensions.
pub(crate) fn decode_graph<S: Scalar>(
    bytes: &[u8],
    metric: MetricKind,
    dimensions: usize,
) -> SerializationResult<DecodedGraph> {
    let mut cursor = bytes;
    let header = GraphHeader::read_expecting(&mut cursor, metric, S::KIND, dimensions)?;
    let count = header.count;
    if count >= INVALID_ID as usize || count > cursor.len() / MIN_NODE_BYTES {
        return Err(corrupt(format!("implausible element count {count}")));
    }

    let mut nodes = Vec::with_capacity(count);
    for index in 0..count {
        let label = read_i64(&mut cursor)?;
        let level = read_u8(&mut cursor)?;
        if level > MAX_LEVEL {
            return Err(corrupt(format!("node {index} has level {level}")));
        }
        let mut links = Vec::with_capacity(level as usize + 1);
        for _ in 0..=level {
            let n = read_u32(&mut cursor)? as usize;
            if n > cursor.len() / 4 {
                return Err(corrupt(format!("node {index} claims {n} links")));
            }
            let mut ids = Vec::with_capacity(n);
            for _ in 0..n {
                let id = read_u32(&mut cursor)?;
                if id as usize >= count {
                    return Err(corrupt(format!("node {index} links to missing node {id}")));
                }
                ids.push(id);
            }
            links.push(ids);
        }
        nodes.push(Node::from_links(label, links));
    }

    let mut offsets = Vec::with_capacity(count + 1);
    for _ in 0..=count {
        let offset = usize::try_from(read_u64(&mut cursor)?).map_err(|_| corrupt("offset exceeds usize"))?;
        if let Some(&previous) = offsets.last() {
            if offset < previous {
                return Err(corrupt("element offsets are not monotonic"));
            }
            if header.dimensions != 0 && offset - previous != header.dimensions {
                return Err(corrupt("element length disagrees with dimensions"));
            }
        } else if offset != 0 {
            return Err(corrupt("first element offset is not zero"));
        }
        offsets.push(offset);
    }

    let position = bytes.len() - cursor.len();
    let start = position.div_ceil(DATA_ALIGNMENT) * DATA_ALIGNMENT;
    let end = offsets
        .last()
        .and_then(|&total| total.checked_mul(std::mem::size_of::<S>()))
        .and_then(|len| start.checked_add(len))
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| corrupt("scalar region is truncated"))?;

    let entry_point = header.entry_point;
    let max_level = header.max_level as usize;
    match nodes.get(entry_point as usize) {
        Some(entry) if entry.level() == max_level => {}
        None if count == 0 && entry_point == INVALID_ID => {}
        _ => return Err(corrupt(format!("bad entry point {entry_point}"))),
    }

    Ok(DecodedGraph {
        nodes,
        offsets,
        entry_point,
        max_level,
        data: start..end,
    })
}
