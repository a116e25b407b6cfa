use crate::core::geometry::{Triangle, Vertex};
use crate::error::{RasterError, Result};
use crate::scene::mesh::Mesh;
use log::{info, warn};
use nalgebra::{Point3, Vector3};
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        // Keep the face structure so non-triangle faces can be skipped.
        triangulate: false,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Loads an OBJ file as a single mesh fitted into the unit cube.
///
/// Only triangular faces are kept; other arities are skipped with a warning.
/// Face references may omit the texture coordinate or normal slot. The
/// mesh's pivot is its centroid and tangents come from the UV mapping.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path_ref = path.as_ref();
    info!("Loading OBJ file: {:?}", path_ref);
    let file = std::fs::File::open(path_ref)?;
    let mut reader = BufReader::new(file);
    parse_obj(&mut reader).map_err(|e| match e {
        RasterError::Obj(msg) => RasterError::Obj(format!("{}: {msg}", path_ref.display())),
        other => other,
    })
}

/// Which optional references one face corner carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CornerSlots {
    texcoord: bool,
    normal: bool,
}

impl Default for CornerSlots {
    fn default() -> Self {
        Self {
            texcoord: true,
            normal: true,
        }
    }
}

/// Corner references of every `f` statement, in file order.
///
/// tobj fills an empty `vt` or `vn` slot with a neighbouring index, so the
/// streams it returns cannot tell an omitted reference from a real one.
fn corner_slots(text: &str) -> Vec<CornerSlots> {
    let mut corners = Vec::new();
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("f") {
            continue;
        }
        for token in tokens {
            let mut parts = token.split('/').skip(1);
            let texcoord = parts.next().is_some_and(|p| !p.is_empty());
            let normal = parts.next().is_some_and(|p| !p.is_empty());
            corners.push(CornerSlots { texcoord, normal });
        }
    }
    corners
}

/// Parses OBJ text from any buffered reader. Material libraries are ignored.
pub fn parse_obj<R: BufRead>(reader: &mut R) -> Result<Mesh> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let (models, _materials) = tobj::load_obj_buf(
        &mut Cursor::new(text.as_bytes()),
        &load_options(),
        |_| Ok(Default::default()),
    )
    .map_err(|e| RasterError::Obj(e.to_string()))?;

    let mut slots = corner_slots(&text);
    let corner_count: usize = models.iter().map(|m| m.mesh.indices.len()).sum();
    if slots.len() != corner_count {
        warn!(
            "Face references ({}) do not match parsed corners ({corner_count}); trusting all slots",
            slots.len()
        );
        slots = vec![CornerSlots::default(); corner_count];
    }

    let mut triangles = Vec::new();
    let mut skipped = 0usize;
    let mut corner_base = 0usize;

    for model in &models {
        let mesh = &model.mesh;
        let face_count = if mesh.face_arities.is_empty() {
            mesh.indices.len() / 3
        } else {
            mesh.face_arities.len()
        };

        let mut offset = 0usize;
        for face in 0..face_count {
            let arity = mesh.face_arities.get(face).map_or(3, |&a| a as usize);
            if arity == 3 {
                let corner = |slot: usize| obj_vertex(mesh, slot, slots[corner_base + slot]);
                triangles.push(Triangle::new(
                    corner(offset)?,
                    corner(offset + 1)?,
                    corner(offset + 2)?,
                ));
            } else {
                skipped += 1;
            }
            offset += arity;
        }
        corner_base += mesh.indices.len();
    }

    if skipped > 0 {
        warn!("Skipped {skipped} non-triangular faces");
    }
    if triangles.is_empty() {
        return Err(RasterError::Obj("no triangular faces".to_string()));
    }
    info!("OBJ loaded: {} models, {} triangles", models.len(), triangles.len());

    let mut mesh = Mesh::new(triangles);
    mesh.normalize();
    mesh.recenter_pivot();
    mesh.calculate_tangents();
    Ok(mesh)
}

/// Resolves the `slot`-th face corner into a vertex. Omitted references give
/// a zero normal or `(0, 0)` uv. The normal's z is negated to match the
/// canvas convention.
fn obj_vertex(mesh: &tobj::Mesh, slot: usize, present: CornerSlots) -> Result<Vertex> {
    let out_of_range =
        |what: &str| RasterError::Obj(format!("{what} index out of range at face corner {slot}"));

    let pi = *mesh.indices.get(slot).ok_or_else(|| out_of_range("face"))? as usize;
    let position = mesh
        .positions
        .get(pi * 3..pi * 3 + 3)
        .map(|p| Point3::new(p[0], p[1], p[2]))
        .ok_or_else(|| out_of_range("position"))?;

    let normal = match mesh.normal_indices.get(slot).filter(|_| present.normal) {
        Some(&ni) => {
            let ni = ni as usize;
            mesh.normals
                .get(ni * 3..ni * 3 + 3)
                .map(|n| Vector3::new(n[0], n[1], -n[2]))
                .ok_or_else(|| out_of_range("normal"))?
        }
        None => Vector3::zeros(),
    };

    let (u, v) = match mesh.texcoord_indices.get(slot).filter(|_| present.texcoord) {
        Some(&ti) => {
            let ti = ti as usize;
            mesh.texcoords
                .get(ti * 2..ti * 2 + 2)
                .map(|t| (t[0], t[1]))
                .ok_or_else(|| out_of_range("texture coordinate"))?
        }
        None => (0.0, 0.0),
    };

    Ok(Vertex::with_frame(position, normal, Vector3::zeros(), Vector3::zeros()).with_uv(u, v))
}
