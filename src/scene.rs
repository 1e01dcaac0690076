use slotmap::{new_key_type, SlotMap};

use crate::config::CountAxis;
use crate::error::SceneError;
use crate::geometry::curve::{Curve, SampledCurve};
use crate::geometry::surface::Surface;
use crate::geometry::trim::TrimLoop;

new_key_type! {
    /// Generational handle to a scene object.
    pub struct ObjectId;
}

/// Non-geometric display attributes inherited by output fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    /// Layer name.
    pub layer: String,
    /// Color index.
    pub color: u32,
    /// Line width.
    pub width: f64,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            layer: "default".into(),
            color: 7,
            width: 1.0,
        }
    }
}

/// The geometry carried by one scene object, already transformed into
/// view space.
pub enum SceneGeometry {
    /// A raw curve, drawn independently of any surface.
    Curve(Box<dyn Curve>),
    /// A raw curve already sampled into view space, possibly rational.
    SampledCurve(SampledCurve),
    /// An untrimmed parametric surface.
    Surface(Box<dyn Surface>),
    /// A parametric surface restricted to the region delimited by trim
    /// loops (even-odd).
    TrimmedSurface {
        surface: Box<dyn Surface>,
        loops: Vec<TrimLoop>,
    },
}

/// One scene object: geometry plus everything the pipeline inherits
/// from it.
pub struct ObjectData {
    pub geometry: SceneGeometry,
    pub attributes: Attributes,
    /// Real multiplier on the configured isoline counts.
    pub resolution_override: Option<f64>,
    /// Which configured count each surface direction draws from.
    /// Volume boundary faces remap these onto the volume's (U, V, W).
    pub count_axes: (CountAxis, CountAxis),
    /// Transparent objects contribute curves but never occlude.
    pub transparent: bool,
}

impl ObjectData {
    fn new(geometry: SceneGeometry, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
            resolution_override: None,
            count_axes: (CountAxis::U, CountAxis::V),
            transparent: false,
        }
    }
}

/// Arena that owns all scene objects.
///
/// Objects reference each other only through generational [`ObjectId`]
/// handles; insertion order is preserved for deterministic pipeline
/// output.
#[derive(Default)]
pub struct SceneStore {
    objects: SlotMap<ObjectId, ObjectData>,
    order: Vec<ObjectId>,
}

impl SceneStore {
    /// Creates a new, empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, data: ObjectData) -> ObjectId {
        let id = self.objects.insert(data);
        self.order.push(id);
        id
    }

    /// Adds a raw curve object.
    pub fn add_curve(&mut self, curve: Box<dyn Curve>, attributes: Attributes) -> ObjectId {
        self.insert(ObjectData::new(SceneGeometry::Curve(curve), attributes))
    }

    /// Adds a pre-sampled curve object.
    pub fn add_sampled_curve(&mut self, curve: SampledCurve, attributes: Attributes) -> ObjectId {
        self.insert(ObjectData::new(SceneGeometry::SampledCurve(curve), attributes))
    }

    /// Adds an untrimmed surface object.
    pub fn add_surface(&mut self, surface: Box<dyn Surface>, attributes: Attributes) -> ObjectId {
        self.insert(ObjectData::new(SceneGeometry::Surface(surface), attributes))
    }

    /// Adds a trimmed surface object.
    pub fn add_trimmed_surface(
        &mut self,
        surface: Box<dyn Surface>,
        loops: Vec<TrimLoop>,
        attributes: Attributes,
    ) -> ObjectId {
        self.insert(ObjectData::new(
            SceneGeometry::TrimmedSurface { surface, loops },
            attributes,
        ))
    }

    /// Adds a volumetric object, reduced to its six boundary surfaces.
    ///
    /// The faces arrive as the three opposite pairs of the volume; each
    /// pair maps its surface parameters onto the volume's isoline
    /// directions so the `"U:V:W"` counts land on the right faces. All
    /// six share one attribute set.
    ///
    /// # Errors
    ///
    /// Returns an error if not exactly six surfaces are given.
    pub fn add_volume(
        &mut self,
        faces: Vec<Box<dyn Surface>>,
        attributes: Attributes,
    ) -> Result<Vec<ObjectId>, SceneError> {
        if faces.len() != 6 {
            return Err(SceneError::BadVolumeBoundary(faces.len()));
        }
        // Pair i of (0,1), (2,3), (4,5) holds the faces of constant W,
        // V, and U respectively.
        let axes = [
            (CountAxis::U, CountAxis::V),
            (CountAxis::U, CountAxis::W),
            (CountAxis::V, CountAxis::W),
        ];
        let mut ids = Vec::with_capacity(6);
        for (i, face) in faces.into_iter().enumerate() {
            let mut data = ObjectData::new(SceneGeometry::Surface(face), attributes.clone());
            data.count_axes = axes[i / 2];
            ids.push(self.insert(data));
        }
        Ok(ids)
    }

    /// Removes an object, invalidating its id. Fragments already
    /// extracted from it keep flowing through the pipeline and fall
    /// back to default attributes at output time.
    pub fn remove(&mut self, id: ObjectId) -> Option<ObjectData> {
        let removed = self.objects.remove(id);
        if removed.is_some() {
            self.order.retain(|&o| o != id);
        }
        removed
    }

    /// Returns a reference to an object, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not in the store.
    pub fn object(&self, id: ObjectId) -> Result<&ObjectData, SceneError> {
        self.objects
            .get(id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("{id:?}")))
    }

    /// Returns a mutable reference to an object, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not in the store.
    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut ObjectData, SceneError> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("{id:?}")))
    }

    /// Objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectData)> {
        self.order
            .iter()
            .filter_map(|&id| self.objects.get(id).map(|data| (id, data)))
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::Plane;

    fn quad(z: f64) -> Box<dyn Surface> {
        Box::new(Plane::axis_aligned(0.0, 1.0, 0.0, 1.0, z).unwrap())
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut scene = SceneStore::new();
        let a = scene.add_surface(quad(0.0), Attributes::default());
        let b = scene.add_surface(quad(1.0), Attributes::default());
        let ids: Vec<ObjectId> = scene.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn volume_requires_six_faces() {
        let mut scene = SceneStore::new();
        let faces: Vec<Box<dyn Surface>> = (0..5).map(|i| quad(f64::from(i))).collect();
        assert!(matches!(
            scene.add_volume(faces, Attributes::default()),
            Err(SceneError::BadVolumeBoundary(5))
        ));
    }

    #[test]
    fn volume_faces_share_attributes_and_map_axes() {
        let mut scene = SceneStore::new();
        let faces: Vec<Box<dyn Surface>> = (0..6).map(|i| quad(f64::from(i))).collect();
        let attrs = Attributes {
            layer: "solid".into(),
            ..Attributes::default()
        };
        let ids = scene.add_volume(faces, attrs).unwrap();
        assert_eq!(ids.len(), 6);
        let last = scene.object(ids[5]).unwrap();
        assert_eq!(last.attributes.layer, "solid");
        assert_eq!(last.count_axes, (CountAxis::V, CountAxis::W));
    }

    #[test]
    fn removed_object_leaves_a_dangling_id() {
        let mut scene = SceneStore::new();
        let a = scene.add_surface(quad(0.0), Attributes::default());
        let b = scene.add_surface(quad(1.0), Attributes::default());
        assert!(scene.remove(a).is_some());
        assert!(scene.object(a).is_err());
        assert!(scene.remove(a).is_none());
        let ids: Vec<ObjectId> = scene.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn missing_object_reports_not_found() {
        let mut scene = SceneStore::new();
        let id = scene.add_surface(quad(0.0), Attributes::default());
        let empty = SceneStore::new();
        assert!(empty.object(id).is_err());
    }
}
