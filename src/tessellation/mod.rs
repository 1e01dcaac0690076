use std::collections::HashMap;

use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{Result, TessellationError};
use crate::geometry::surface::Surface;
use crate::geometry::trim::{point_in_loops, TrimLoop};
use crate::math::{Point2, Point3};

/// Parameters controlling the coarse surface tessellation fed to the
/// depth buffer.
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Grid cells per parametric direction.
    pub segments: usize,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self { segments: 16 }
    }
}

/// A triangle mesh approximation of a surface.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions (view space).
    pub vertices: Vec<Point3>,
    /// Parameter-space coordinates of each vertex.
    pub uvs: Vec<Point2>,
    /// Triangle indices (each triple defines a triangle).
    pub indices: Vec<[u32; 3]>,
}

/// Tessellates an untrimmed surface on a regular parameter grid.
///
/// # Errors
///
/// Returns an error if the parameters are degenerate or surface
/// evaluation fails.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn tessellate_surface(
    surface: &dyn Surface,
    params: &TessellationParams,
) -> Result<TriangleMesh> {
    let n = params.segments;
    if n == 0 {
        return Err(
            TessellationError::InvalidParameters("segments must be positive".into()).into(),
        );
    }
    let domain = surface.domain();
    let mut mesh = TriangleMesh::default();

    for j in 0..=n {
        let v = domain.v_min + (domain.v_max - domain.v_min) * (j as f64) / (n as f64);
        for i in 0..=n {
            let u = domain.u_min + (domain.u_max - domain.u_min) * (i as f64) / (n as f64);
            mesh.vertices.push(surface.evaluate(u, v)?);
            mesh.uvs.push(Point2::new(u, v));
        }
    }

    let stride = (n + 1) as u32;
    for j in 0..n as u32 {
        for i in 0..n as u32 {
            let i00 = j * stride + i;
            let i10 = i00 + 1;
            let i01 = i00 + stride;
            let i11 = i01 + 1;
            mesh.indices.push([i00, i10, i11]);
            mesh.indices.push([i00, i11, i01]);
        }
    }
    Ok(mesh)
}

/// Tessellates a trimmed surface.
///
/// The trim loops are inserted as constraint edges into a constrained
/// Delaunay triangulation of the parameter domain, together with an
/// unconstrained interior grid for shape fidelity; triangles whose
/// centroid fails even-odd containment against the loops are dropped,
/// and the survivors are evaluated onto the surface.
///
/// # Errors
///
/// Returns an error if triangulation or surface evaluation fails.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn tessellate_trimmed(
    surface: &dyn Surface,
    loops: &[TrimLoop],
    params: &TessellationParams,
) -> Result<TriangleMesh> {
    if loops.is_empty() {
        return tessellate_surface(surface, params);
    }

    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    for l in loops {
        insert_constraint_loop(&mut cdt, l)?;
    }

    let n = params.segments.max(1);
    let domain = surface.domain();
    for j in 0..=n {
        let v = domain.v_min + (domain.v_max - domain.v_min) * (j as f64) / (n as f64);
        for i in 0..=n {
            let u = domain.u_min + (domain.u_max - domain.u_min) * (i as f64) / (n as f64);
            cdt.insert(SpadePoint2::new(u, v))
                .map_err(|e: InsertionError| {
                    TessellationError::Failed(format!("CDT insert: {e}"))
                })?;
        }
    }

    let mut mesh = TriangleMesh::default();
    let mut vertex_map: HashMap<usize, u32> = HashMap::new();

    for face in cdt.inner_faces() {
        let verts = face.vertices();
        let positions: Vec<SpadePoint2<f64>> = verts.iter().map(|v| v.position()).collect();
        let cu = (positions[0].x + positions[1].x + positions[2].x) / 3.0;
        let cv = (positions[0].y + positions[1].y + positions[2].y) / 3.0;
        if !point_in_loops(loops, cu, cv) {
            continue;
        }

        let mut tri = [0u32; 3];
        for (k, vh) in verts.iter().enumerate() {
            let idx = vh.fix().index();
            let mesh_idx = if let Some(&existing) = vertex_map.get(&idx) {
                existing
            } else {
                let (u, v) = (vh.position().x, vh.position().y);
                let new_idx = mesh.vertices.len() as u32;
                mesh.vertices.push(surface.evaluate(u, v)?);
                mesh.uvs.push(Point2::new(u, v));
                vertex_map.insert(idx, new_idx);
                new_idx
            };
            tri[k] = mesh_idx;
        }
        mesh.indices.push(tri);
    }

    Ok(mesh)
}

/// Inserts a trim loop as constraint edges into the CDT.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    l: &TrimLoop,
) -> Result<()> {
    let mut handles = Vec::with_capacity(l.points().len());
    for p in l.points() {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }
    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }
    Ok(())
}
