use serde::Serialize;
use slotmap::{new_key_type, SlotMap};

use crate::geometry::curve::SampledCurve;
use crate::scene::ObjectId;

new_key_type! {
    /// Generational handle to a curve fragment.
    pub struct FragmentId;
}

/// Classification of a curve fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// A raw scene curve, independent of any surface.
    Independent,
    /// A surface boundary (domain extreme or trim-loop edge).
    Boundary,
    /// A constant-parameter interior curve.
    Isoparametric,
    /// The locus where the view direction grazes the surface.
    Silhouette,
    /// A tangent-plane (C1) discontinuity seam.
    Discontinuity,
}

impl FragmentKind {
    /// Active curves (boundary, silhouette) drive visibility changes;
    /// passive curves are only ever split by them.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Boundary | Self::Silhouette)
    }
}

/// Tri-state hidden flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Not yet resolved.
    #[default]
    Unknown,
    Visible,
    Hidden,
}

/// A classified curve fragment flowing through the pipeline.
///
/// Splitting never changes the kind, origin, or shared-edge id, and
/// slices the preimage at the same parameter: a fragment's preimage
/// shares its parameterization, so the 2D curve that produced an
/// evaluated 3D curve stays attached (and re-evaluable) until
/// visibility resolution completes.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Classification tag.
    pub kind: FragmentKind,
    /// The scene object this fragment came from.
    pub origin: ObjectId,
    /// View-space geometry.
    pub curve: SampledCurve,
    /// The parameter-space curve that produced `curve`, if evaluated
    /// from a surface.
    pub preimage: Option<SampledCurve>,
    /// Groups fragments that are the same geometric edge seen from two
    /// trimmed patches.
    pub shared_edge: Option<u32>,
    /// Hidden flag, decorated by the visibility resolver.
    pub visibility: Visibility,
}

impl Fragment {
    /// Creates a fragment with unresolved visibility.
    #[must_use]
    pub fn new(kind: FragmentKind, origin: ObjectId, curve: SampledCurve) -> Self {
        Self {
            kind,
            origin,
            curve,
            preimage: None,
            shared_edge: None,
            visibility: Visibility::Unknown,
        }
    }

    /// Attaches the parameter-space preimage curve.
    #[must_use]
    pub fn with_preimage(mut self, preimage: SampledCurve) -> Self {
        self.preimage = Some(preimage);
        self
    }

    /// Tags the fragment with a shared-edge identifier.
    #[must_use]
    pub fn with_shared_edge(mut self, id: u32) -> Self {
        self.shared_edge = Some(id);
        self
    }

    /// Splits the fragment at parameter `t`, preserving all attributes
    /// on both halves.
    ///
    /// Returns `None` when the split is refused because `t` is too
    /// close to the fragment's own domain boundary — a stable terminal
    /// condition, not an error.
    #[must_use]
    pub fn split_at(&self, t: f64) -> Option<(Self, Self)> {
        let (curve_a, curve_b) = self.curve.split_at(t)?;
        let (pre_a, pre_b) = match &self.preimage {
            Some(pre) => match pre.split_at(t) {
                Some((a, b)) => (Some(a), Some(b)),
                // The preimage shares the curve's parameterization, so
                // a refused preimage split would leave the halves
                // inconsistent; keep the whole preimage on both.
                None => (self.preimage.clone(), self.preimage.clone()),
            },
            None => (None, None),
        };
        let make = |curve: SampledCurve, preimage: Option<SampledCurve>| Self {
            kind: self.kind,
            origin: self.origin,
            curve,
            preimage,
            shared_edge: self.shared_edge,
            visibility: self.visibility,
        };
        Some((make(curve_a, pre_a), make(curve_b, pre_b)))
    }
}

/// Arena of fragments with deterministic insertion order.
///
/// Fragments are owned here and addressed by generational ids, so
/// splitting (replace one entry by two, in place in the order) never
/// invalidates other handles mid-scan.
#[derive(Default)]
pub struct FragmentSet {
    slots: SlotMap<FragmentId, Fragment>,
    order: Vec<FragmentId>,
}

impl FragmentSet {
    /// Creates an empty fragment set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fragment at the end of the order.
    pub fn insert(&mut self, fragment: Fragment) -> FragmentId {
        let id = self.slots.insert(fragment);
        self.order.push(id);
        id
    }

    /// Returns the fragment, if live.
    #[must_use]
    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.slots.get(id)
    }

    /// Returns the fragment mutably, if live.
    #[must_use]
    pub fn get_mut(&mut self, id: FragmentId) -> Option<&mut Fragment> {
        self.slots.get_mut(id)
    }

    /// Removes and returns a fragment.
    pub fn remove(&mut self, id: FragmentId) -> Option<Fragment> {
        self.slots.remove(id)
    }

    /// Live fragment ids in insertion/split order.
    #[must_use]
    pub fn ids(&self) -> Vec<FragmentId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.slots.contains_key(id))
            .collect()
    }

    /// Live fragments in order.
    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &Fragment)> {
        self.order
            .iter()
            .filter_map(|&id| self.slots.get(id).map(|f| (id, f)))
    }

    /// Number of live fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the set holds no fragments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Splits a fragment in place: the original is removed and its two
    /// halves take its position in the order.
    ///
    /// Returns `None` if the fragment is missing or the split was
    /// refused (too close to a domain endpoint).
    pub fn split(&mut self, id: FragmentId, t: f64) -> Option<(FragmentId, FragmentId)> {
        let (a, b) = self.slots.get(id)?.split_at(t)?;
        let pos = self.order.iter().position(|&x| x == id)?;
        self.slots.remove(id);
        let ida = self.slots.insert(a);
        let idb = self.slots.insert(b);
        self.order.splice(pos..=pos, [ida, idb]);
        Some((ida, idb))
    }
}
