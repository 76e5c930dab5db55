/// The element-type tag. Quad and hex are fully implemented; `Tri` exists
/// only so the supermesh helper (§4.5) can describe a clipped tetrahedron's
/// 2-D cross sections, and is rejected at `Element::setup` with a fatal
/// error (design note: element polymorphism is a closed, tagged variant,
/// not a runtime inheritance hierarchy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElementKind {
    Quad,
    Hex,
    Tri,
}

impl ElementKind {
    /// Spatial dimension of the reference element.
    pub fn dims(&self) -> usize {
        match self {
            ElementKind::Quad => 2,
            ElementKind::Hex => 3,
            ElementKind::Tri => 2,
        }
    }

    /// Number of faces of the reference element (used to size the flux
    /// point and reference-normal tables).
    pub fn num_faces(&self) -> usize {
        match self {
            ElementKind::Quad => 4,
            ElementKind::Hex => 6,
            ElementKind::Tri => 3,
        }
    }

    /// Whether this kind is supported by the residual pipeline. Only quad
    /// and hex are; a `Tri` reaching `Element::setup` is a fatal error.
    pub fn is_supported(&self) -> bool {
        matches!(self, ElementKind::Quad | ElementKind::Hex)
    }
}
