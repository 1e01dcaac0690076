pub mod curve;
pub mod silhouette;
pub mod surface;
pub mod trim;

pub use curve::{Arc, Curve, CurveDomain, CurveForm, Line, SampledCurve};
pub use silhouette::{silhouette_curves, SilhouetteOptions};
pub use surface::{Cylinder, Direction, ExtrudedPolyline, Plane, Sphere, Surface, SurfaceDomain};
pub use trim::TrimLoop;
