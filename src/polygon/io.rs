//! Binary persistence of a single polygon.
//!
//! # Layout
//!
//! 1. **Magic**: `BCPL` (4 bytes)
//! 2. **Version**: little-endian `u32` (currently 2)
//! 3. **Body**: `bincode`, fields in this order:
//!    - vertex positions `[f64; 3]`
//!    - edges `[u32; 2]`
//!    - flags `u32`, material id `i32`
//!    - plane normal and `w` as `[f64; 4]`
//!    - texture coordinates `[f64; 2]` per vertex (version 2 and later)
//!
//! Version 1 bodies carry no UVs; they are rebuilt by planar projection on
//! load.

use super::{EdgeIndices, Polygon, PolygonFlags};
use crate::errors::PersistError;
use crate::float_types::Real;
use crate::plane::Plane;
use crate::vertex::Vertex;
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

/// Magic bytes identifying a serialized polygon.
pub const POLYGON_MAGIC: [u8; 4] = *b"BCPL";

/// Current format version.
pub const POLYGON_FORMAT_VERSION: u32 = 2;

/// First version that stores texture coordinates.
const UV_VERSION: u32 = 2;

const HEADER_LEN: usize = 8;

/// Fields every format version stores.
#[derive(Debug, Serialize, Deserialize)]
struct PolygonBody {
    positions: Vec<[f64; 3]>,
    edges: Vec<[u32; 2]>,
    flags: u32,
    material_id: i32,
    plane: [f64; 4],
}

/// Current body: the shared fields followed by one UV per vertex.
#[derive(Debug, Serialize, Deserialize)]
struct PolygonRecord {
    body: PolygonBody,
    uvs: Vec<[f64; 2]>,
}

fn index_u32(index: usize) -> std::io::Result<u32> {
    u32::try_from(index).map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "vertex index does not fit in u32"))
}

impl PolygonBody {
    fn capture(polygon: &Polygon) -> Result<Self, PersistError> {
        let edges = polygon
            .edges()
            .iter()
            .map(|&[a, b]| -> std::io::Result<[u32; 2]> { Ok([index_u32(a)?, index_u32(b)?]) })
            .collect::<std::io::Result<Vec<_>>>()?;
        let plane = polygon.plane();
        Ok(PolygonBody {
            positions: polygon
                .vertices()
                .iter()
                .map(|v| [v.pos.x as f64, v.pos.y as f64, v.pos.z as f64])
                .collect(),
            edges,
            flags: polygon.flags().bits(),
            material_id: polygon.material_id(),
            plane: [
                plane.normal.x as f64,
                plane.normal.y as f64,
                plane.normal.z as f64,
                plane.w as f64,
            ],
        })
    }
}

/// Header field at `offset`, or how much of it is missing.
fn header_word(bytes: &[u8], offset: usize) -> Result<[u8; 4], PersistError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|word| word.try_into().ok())
        .ok_or(PersistError::Truncated {
            needed: 4,
            available: bytes.len().saturating_sub(offset),
        })
}

impl Polygon {
    /// Serialize into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + 32 + self.vertex_count() * 40 + self.edge_count() * 8 + 40);
        // Writing into a Vec only fails on indices past u32::MAX
        if let Err(error) = self.write_to(&mut bytes) {
            debug!(polygon = self.id().get(), %error, "Polygon too large to serialize");
            bytes.clear();
        }
        bytes
    }

    /// Write the header and the current body to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), PersistError> {
        let record = PolygonRecord {
            body: PolygonBody::capture(self)?,
            uvs: self
                .vertices()
                .iter()
                .map(|v| [v.uv.x as f64, v.uv.y as f64])
                .collect(),
        };
        writer.write_all(&POLYGON_MAGIC)?;
        writer.write_all(&POLYGON_FORMAT_VERSION.to_le_bytes())?;
        bincode::serialize_into(writer, &record)?;
        Ok(())
    }

    /// Read a whole payload from `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Polygon, PersistError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a payload written by [`Polygon::to_bytes`] or an older version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Polygon, PersistError> {
        let magic = header_word(bytes, 0)?;
        if magic != POLYGON_MAGIC {
            return Err(PersistError::BadMagic(magic));
        }
        let version = u32::from_le_bytes(header_word(bytes, 4)?);
        if version == 0 || version > POLYGON_FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }

        let payload = &bytes[HEADER_LEN..];
        let (body, uvs) = if version >= UV_VERSION {
            let record: PolygonRecord = bincode::deserialize(payload)?;
            (record.body, Some(record.uvs))
        } else {
            (bincode::deserialize::<PolygonBody>(payload)?, None)
        };

        let vertex_count = body.positions.len();
        let mut edges: Vec<EdgeIndices> = Vec::with_capacity(body.edges.len());
        for (edge, &[a, b]) in body.edges.iter().enumerate() {
            let pair = [a as usize, b as usize];
            if let Some(&index) = pair.iter().find(|&&i| i >= vertex_count) {
                return Err(PersistError::EdgeIndexOutOfRange {
                    edge,
                    index,
                    vertex_count,
                });
            }
            edges.push(pair);
        }

        let mut vertices: Vec<Vertex> = body
            .positions
            .iter()
            .map(|&[x, y, z]| Vertex::from_pos(Point3::new(x as Real, y as Real, z as Real)))
            .collect();
        if let Some(uvs) = &uvs {
            if uvs.len() != vertex_count {
                return Err(PersistError::UvCountMismatch {
                    uvs: uvs.len(),
                    vertices: vertex_count,
                });
            }
            for (vertex, &[u, v]) in vertices.iter_mut().zip(uvs) {
                vertex.uv = Vector2::new(u as Real, v as Real);
            }
        }

        let [nx, ny, nz, w] = body.plane;
        let plane = Plane {
            normal: Vector3::new(nx as Real, ny as Real, nz as Real),
            w: w as Real,
        };
        let flags = PolygonFlags::from_bits_retain(body.flags);
        let mut polygon = Polygon::from_parts(vertices, edges, plane, body.material_id, flags);
        if uvs.is_none() {
            polygon.reset_uvs();
        }
        Ok(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Polygon {
        let mut polygon = Polygon::from_positions(&[
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ])
        .unwrap();
        polygon.set_material_id(-7);
        polygon.add_flags(PolygonFlags::HIDDEN);
        polygon
    }

    fn with_header(version: u32, body: &[u8]) -> Vec<u8> {
        let mut bytes = POLYGON_MAGIC.to_vec();
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn round_trip_keeps_every_field() {
        let polygon = quad();
        let loaded = Polygon::from_bytes(&polygon.to_bytes()).unwrap();
        assert_eq!(loaded.vertices(), polygon.vertices());
        assert_eq!(loaded.edges(), polygon.edges());
        assert_eq!(loaded.plane(), polygon.plane());
        assert_eq!(loaded.material_id(), -7);
        assert_eq!(loaded.flags(), polygon.flags());
    }

    #[test]
    fn version_one_payload_rebuilds_uvs() {
        let polygon = quad();
        let body = bincode::serialize(&PolygonBody::capture(&polygon).unwrap()).unwrap();
        let loaded = Polygon::from_bytes(&with_header(1, &body)).unwrap();
        assert_eq!(loaded.edge_count(), 4);
        let uvs: Vec<_> = loaded.vertices().iter().map(|v| v.uv).collect();
        let expected: Vec<_> = polygon.vertices().iter().map(|v| v.uv).collect();
        assert_eq!(uvs, expected);
    }

    #[test]
    fn rejects_foreign_and_future_payloads() {
        let mut bytes = quad().to_bytes();
        bytes[4..8].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(Polygon::from_bytes(&bytes), Err(PersistError::UnsupportedVersion(9))));
        bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(Polygon::from_bytes(&bytes), Err(PersistError::UnsupportedVersion(0))));
        assert!(matches!(Polygon::from_bytes(b"NOPE"), Err(PersistError::BadMagic(m)) if &m == b"NOPE"));
    }

    #[test]
    fn short_header_reports_shortfall() {
        let err = Polygon::from_bytes(b"BCPL\x02").unwrap_err();
        assert!(matches!(err, PersistError::Truncated { needed: 4, available: 1 }));
    }

    #[test]
    fn truncated_body_is_a_codec_error() {
        let bytes = quad().to_bytes();
        let err = Polygon::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, PersistError::Codec(_)));
    }

    #[test]
    fn edge_past_vertex_list_is_rejected() {
        let polygon = quad();
        let mut body = PolygonBody::capture(&polygon).unwrap();
        body.edges[0][1] = 40;
        let record = PolygonRecord { body, uvs: vec![[0.0; 2]; 4] };
        let bytes = with_header(POLYGON_FORMAT_VERSION, &bincode::serialize(&record).unwrap());
        assert!(matches!(
            Polygon::from_bytes(&bytes),
            Err(PersistError::EdgeIndexOutOfRange { edge: 0, index: 40, vertex_count: 4 })
        ));
    }

    #[test]
    fn uv_list_must_match_vertices() {
        let record = PolygonRecord {
            body: PolygonBody::capture(&quad()).unwrap(),
            uvs: vec![[0.0; 2]; 3],
        };
        let bytes = with_header(POLYGON_FORMAT_VERSION, &bincode::serialize(&record).unwrap());
        assert!(matches!(
            Polygon::from_bytes(&bytes),
            Err(PersistError::UvCountMismatch { uvs: 3, vertices: 4 })
        ));
    }

    #[test]
    fn read_from_matches_from_bytes() {
        let bytes = quad().to_bytes();
        let loaded = Polygon::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(loaded.vertex_count(), 4);
    }
}
