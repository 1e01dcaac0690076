use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::fragment::{Fragment, FragmentSet, Visibility};
use crate::geometry::surface::Surface;
use crate::math::Point3;
use crate::scene::{ObjectData, SceneGeometry, SceneStore};
use crate::tessellation::{
    tessellate_surface, tessellate_trimmed, TessellationParams, TriangleMesh,
};

/// Fixed offset of the normal-displaced probes.
const NORMAL_NUDGE: f64 = 1e-3;

/// Interior sample positions along a fragment's parameter domain.
const SAMPLE_FRACTIONS: [f64; 2] = [1.0 / 3.0, 2.0 / 3.0];

/// A min-depth raster over the scene's screen extent.
///
/// Cells start at infinity; rasterizing a triangle lowers every cell
/// whose center it covers to the interpolated depth. Queries outside
/// the extent read as unoccluded.
pub struct DepthBuffer {
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
    width: usize,
    height: usize,
    cells: Vec<f64>,
}

impl DepthBuffer {
    /// Creates a buffer of `resolution` x `resolution` cells over the
    /// given `(min_x, min_y, max_x, max_y)` bounds.
    #[must_use]
    pub fn new(bounds: (f64, f64, f64, f64), resolution: usize) -> Self {
        let (min_x, min_y, max_x, max_y) = bounds;
        let n = resolution.max(1);
        #[allow(clippy::cast_precision_loss)]
        let cells_f = n as f64;
        let cell_w = ((max_x - min_x) / cells_f).max(f64::MIN_POSITIVE);
        let cell_h = ((max_y - min_y) / cells_f).max(f64::MIN_POSITIVE);
        Self {
            min_x,
            min_y,
            cell_w,
            cell_h,
            width: n,
            height: n,
            cells: vec![f64::INFINITY; n * n],
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        let col = (x - self.min_x) / self.cell_w;
        let row = (y - self.min_y) / self.cell_h;
        // Half a cell of slack so points on the extent's far edge
        // still read the last cell.
        if !(-0.5..=self.width as f64 + 0.5).contains(&col)
            || !(-0.5..=self.height as f64 + 0.5).contains(&row)
        {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let col = (col.floor().max(0.0) as usize).min(self.width - 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row = (row.floor().max(0.0) as usize).min(self.height - 1);
        Some(row * self.width + col)
    }

    /// Minimum rasterized depth at a screen position, or infinity
    /// outside the buffer.
    #[must_use]
    pub fn depth_at(&self, x: f64, y: f64) -> f64 {
        self.cell_index(x, y)
            .map_or(f64::INFINITY, |i| self.cells[i])
    }

    /// Rasterizes one triangle, keeping the minimum depth per cell.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize_triangle(&mut self, a: &Point3, b: &Point3, c: &Point3) {
        let den = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if den.abs() < 1e-12 {
            return;
        }
        let (lo_x, hi_x) = (a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x));
        let (lo_y, hi_y) = (a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y));
        let col0 = (((lo_x - self.min_x) / self.cell_w).floor().max(0.0) as usize)
            .min(self.width - 1);
        let col1 = (((hi_x - self.min_x) / self.cell_w).ceil().max(0.0) as usize)
            .min(self.width - 1);
        let row0 = (((lo_y - self.min_y) / self.cell_h).floor().max(0.0) as usize)
            .min(self.height - 1);
        let row1 = (((hi_y - self.min_y) / self.cell_h).ceil().max(0.0) as usize)
            .min(self.height - 1);

        for row in row0..=row1 {
            let y = self.min_y + (row as f64 + 0.5) * self.cell_h;
            for col in col0..=col1 {
                let x = self.min_x + (col as f64 + 0.5) * self.cell_w;
                let l0 = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / den;
                let l1 = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / den;
                let l2 = 1.0 - l0 - l1;
                if l0 < -1e-9 || l1 < -1e-9 || l2 < -1e-9 {
                    continue;
                }
                let z = l0 * a.z + l1 * b.z + l2 * c.z;
                let cell = &mut self.cells[row * self.width + col];
                if z < *cell {
                    *cell = z;
                }
            }
        }
    }
}

/// Stage four: decorates every fragment with a visible/hidden verdict.
///
/// All non-transparent surfaces are tessellated and rasterized into a
/// shared depth buffer; each fragment is then probed at two interior
/// samples. A sample counts occluded when its own depth exceeds the
/// probed minimum by more than the comparison epsilon; the fragment is
/// hidden only if every sample is occluded. Where a surface preimage
/// is available, each sample also probes at small normal offsets to
/// disambiguate grazing self-occlusion.
pub struct VisibilityResolver<'a> {
    config: &'a Config,
}

impl<'a> VisibilityResolver<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Resolves visibility for every fragment in the set.
    ///
    /// # Errors
    ///
    /// Returns an error if tessellating an occluder fails.
    pub fn execute(&self, scene: &SceneStore, set: &mut FragmentSet) -> Result<()> {
        let meshes = occluder_meshes(scene)?;
        if meshes.is_empty() {
            for id in set.ids() {
                if let Some(f) = set.get_mut(id) {
                    f.visibility = Visibility::Visible;
                }
            }
            return Ok(());
        }

        let mut bounds = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for mesh in &meshes {
            for v in &mesh.vertices {
                bounds.0 = bounds.0.min(v.x);
                bounds.1 = bounds.1.min(v.y);
                bounds.2 = bounds.2.max(v.x);
                bounds.3 = bounds.3.max(v.y);
            }
        }
        let mut buffer = DepthBuffer::new(bounds, self.config.depth_resolution);
        for mesh in &meshes {
            for tri in &mesh.indices {
                buffer.rasterize_triangle(
                    &mesh.vertices[tri[0] as usize],
                    &mesh.vertices[tri[1] as usize],
                    &mesh.vertices[tri[2] as usize],
                );
            }
        }
        debug!(occluders = meshes.len(), "depth buffer filled");

        let eps = self.config.tolerance + self.config.depth_bias;
        for id in set.ids() {
            let Some(fragment) = set.get(id) else {
                continue;
            };
            let verdict = classify(scene, fragment, &buffer, eps);
            if let Some(f) = set.get_mut(id) {
                f.visibility = verdict;
            }
        }
        Ok(())
    }
}

fn occluder_meshes(scene: &SceneStore) -> Result<Vec<TriangleMesh>> {
    let params = TessellationParams::default();
    let mut meshes = Vec::new();
    for (_, data) in scene.iter() {
        if data.transparent {
            continue;
        }
        match &data.geometry {
            SceneGeometry::Surface(surface) => {
                meshes.push(tessellate_surface(surface.as_ref(), &params)?);
            }
            SceneGeometry::TrimmedSurface { surface, loops } => {
                meshes.push(tessellate_trimmed(surface.as_ref(), loops, &params)?);
            }
            SceneGeometry::Curve(_) | SceneGeometry::SampledCurve(_) => {}
        }
    }
    Ok(meshes)
}

fn classify(scene: &SceneStore, fragment: &Fragment, buffer: &DepthBuffer, eps: f64) -> Visibility {
    let domain = fragment.curve.domain();
    for frac in SAMPLE_FRACTIONS {
        let t = domain.t_min + domain.span() * frac;
        let p = fragment.curve.point_at(t);
        let mut probe = buffer.depth_at(p.x, p.y);
        if let Some(pre) = &fragment.preimage {
            if let Ok(data) = scene.object(fragment.origin) {
                if let Some(surface) = surface_of(data) {
                    let uv = pre.point_at(t);
                    if let Ok(n) = surface.normal(uv.x, uv.y) {
                        for sign in [1.0, -1.0] {
                            let q = p + n * (sign * NORMAL_NUDGE);
                            probe = probe.min(buffer.depth_at(q.x, q.y));
                        }
                    }
                }
            }
        }
        if p.z <= probe + eps {
            return Visibility::Visible;
        }
    }
    Visibility::Hidden
}

fn surface_of(data: &ObjectData) -> Option<&dyn Surface> {
    match &data.geometry {
        SceneGeometry::Surface(surface) => Some(surface.as_ref()),
        SceneGeometry::TrimmedSurface { surface, .. } => Some(surface.as_ref()),
        SceneGeometry::Curve(_) | SceneGeometry::SampledCurve(_) => None,
    }
}
