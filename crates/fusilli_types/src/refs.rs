//! Static visitation of embedded component references.
//!
//! Components refer to one another by identifier, both at the top level
//! (`Texture.image`, `BufferView.source_buffer`) and inside nested records
//! (`GeometryPatch.attributes[*].view`, `Entity.render_rep.instances.view`).
//! [`VisitRefs`] reports every embedded identifier so the scene engine can
//! maintain its reverse reference index without any runtime reflection.

use crate::id::AnyId;

/// Reports every component identifier embedded in a value, at any depth.
///
/// A component's own `id` field is never reported.
pub trait VisitRefs {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId));
}

impl<T: VisitRefs> VisitRefs for Option<T> {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        if let Some(value) = self {
            value.visit_refs(visit);
        }
    }
}

impl<T: VisitRefs> VisitRefs for Vec<T> {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        for value in self {
            value.visit_refs(visit);
        }
    }
}
