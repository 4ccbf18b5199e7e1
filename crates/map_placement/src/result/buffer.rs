//! Compacted output storage and its wire layout.
//!
//! Layout of [`ResultBuffer::to_le_bytes`]:
//! - `num_classes` little-endian `u32` counts, one per class in class order;
//! - tightly packed 16-byte elements `{ [f32; 3] position, u32 class_index }`,
//!   grouped by ascending class and in generation order within a class.
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::{Error, Result};

/// Size in bytes of one packed element.
pub const ELEMENT_SIZE: usize = 16;
/// Size in bytes of one class count in the header.
pub const COUNT_SIZE: usize = 4;

/// A placed object: world position plus class index.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlacementElement {
    pub position: [f32; 3],
    pub class_index: u32,
}

const _: () = assert!(std::mem::size_of::<PlacementElement>() == ELEMENT_SIZE);

impl PlacementElement {
    pub fn new(position: Vec3, class_index: u32) -> Self {
        Self {
            position: position.to_array(),
            class_index,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Ground-plane position `(x, z)`.
    #[inline]
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[2])
    }
}

/// Counters describing how the candidates of one request were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementStats {
    /// Candidates generated over the padded area.
    pub candidates: usize,
    /// Candidates outside the query bounds.
    pub out_of_bounds: usize,
    /// In-bounds candidates no class claimed.
    pub unassigned: usize,
    /// Candidates written to the output.
    pub placed: usize,
}

/// Per-class counts followed by class-grouped elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBuffer {
    counts: Vec<u32>,
    values: Vec<PlacementElement>,
    stats: PlacementStats,
}

impl ResultBuffer {
    /// An empty buffer with `num_classes` zero counts.
    pub fn empty(num_classes: usize) -> Self {
        Self {
            counts: vec![0; num_classes],
            values: Vec::new(),
            stats: PlacementStats::default(),
        }
    }

    pub(crate) fn from_parts(
        counts: Vec<u32>,
        values: Vec<PlacementElement>,
        stats: PlacementStats,
    ) -> Self {
        debug_assert_eq!(
            counts.iter().map(|c| *c as usize).sum::<usize>(),
            values.len()
        );
        Self {
            counts,
            values,
            stats,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    /// Per-class element counts.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// All elements, grouped by class.
    pub fn values(&self) -> &[PlacementElement] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> PlacementStats {
        self.stats
    }

    /// Size of the encoded buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.counts.len() * COUNT_SIZE + self.values.len() * ELEMENT_SIZE
    }

    /// Zero-copy view of the element section in native byte order.
    ///
    /// Identical to the wire layout on little-endian hosts; suitable for direct
    /// upload as a vertex or storage buffer.
    pub fn values_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }

    /// Encodes the buffer in the little-endian wire layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for count in &self.counts {
            out.extend_from_slice(&count.to_le_bytes());
        }
        for element in &self.values {
            for c in element.position {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.extend_from_slice(&element.class_index.to_le_bytes());
        }
        out
    }

    /// Decodes a buffer from the little-endian wire layout.
    ///
    /// Fails if the length does not match the header, or if elements are not grouped
    /// by ascending class consistent with the counts.
    pub fn from_le_bytes(bytes: &[u8], num_classes: usize) -> Result<Self> {
        let header = num_classes.checked_mul(COUNT_SIZE).ok_or_else(|| {
            Error::InvalidBuffer(format!("{num_classes} class counts overflow the header size"))
        })?;
        if bytes.len() < header {
            return Err(Error::InvalidBuffer(format!(
                "{} bytes cannot hold {} class counts",
                bytes.len(),
                num_classes
            )));
        }

        let counts: Vec<u32> = bytes[..header]
            .chunks_exact(COUNT_SIZE)
            .map(read_u32)
            .collect();
        let total: usize = counts.iter().map(|c| *c as usize).sum();
        let body_len = total.checked_mul(ELEMENT_SIZE).ok_or_else(|| {
            Error::InvalidBuffer(format!("counts announce {total} elements, too many to address"))
        })?;

        let body = &bytes[header..];
        if body.len() != body_len {
            return Err(Error::InvalidBuffer(format!(
                "counts announce {} elements ({} bytes), found {} bytes",
                total,
                body_len,
                body.len()
            )));
        }

        let values: Vec<PlacementElement> = body
            .chunks_exact(ELEMENT_SIZE)
            .map(|chunk| PlacementElement {
                position: [
                    f32::from_bits(read_u32(&chunk[0..4])),
                    f32::from_bits(read_u32(&chunk[4..8])),
                    f32::from_bits(read_u32(&chunk[8..12])),
                ],
                class_index: read_u32(&chunk[12..16]),
            })
            .collect();

        let mut start = 0usize;
        for (class, count) in counts.iter().enumerate() {
            let end = start + *count as usize;
            if let Some(bad) = values[start..end]
                .iter()
                .find(|e| e.class_index as usize != class)
            {
                return Err(Error::InvalidBuffer(format!(
                    "element with class {} inside the range of class {}",
                    bad.class_index, class
                )));
            }
            start = end;
        }

        let stats = PlacementStats {
            placed: values.len(),
            ..PlacementStats::default()
        };
        Ok(Self {
            counts,
            values,
            stats,
        })
    }
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
