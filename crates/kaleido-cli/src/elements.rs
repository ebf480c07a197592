//! Part elements a job can place and repeat.

use std::fmt;

use kaleido_core::ClonableElement;
use kaleido_geometry::RigidPlacement;
use serde::{Deserialize, Serialize};

fn default_connector_type() -> String {
    "Custom2DField".into()
}

/// Type-specific state of a part element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    /// Connection point between parts.
    Connection {
        #[serde(default = "default_connector_type")]
        connector_type: String,
        #[serde(default)]
        sub_type: u32,
    },
    /// Placed reference to a shared mesh.
    MeshReference { mesh_id: String },
    /// Free-form surface. Surfaces are edited in place and cannot be
    /// duplicated by a pattern.
    Surface,
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Connection { .. } => "connection",
            ElementKind::MeshReference { .. } => "mesh_reference",
            ElementKind::Surface => "surface",
        }
    }

    /// Short description of the type-specific state.
    pub fn detail(&self) -> String {
        match self {
            ElementKind::Connection {
                connector_type,
                sub_type,
            } => format!("{}:{}", connector_type, sub_type),
            ElementKind::MeshReference { mesh_id } => mesh_id.clone(),
            ElementKind::Surface => String::new(),
        }
    }
}

/// A named element with a placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartElement {
    pub name: String,
    pub kind: ElementKind,
    pub placement: RigidPlacement,
}

impl PartElement {
    pub fn new(name: impl Into<String>, kind: ElementKind, placement: RigidPlacement) -> Self {
        Self {
            name: name.into(),
            kind,
            placement,
        }
    }
}

impl fmt::Display for PartElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind.label(), self.name)
    }
}

impl ClonableElement for PartElement {
    fn placement(&self) -> &RigidPlacement {
        &self.placement
    }

    fn supports_duplication(&self) -> bool {
        !matches!(self.kind, ElementKind::Surface)
    }

    fn duplicate_with(&self, placement: RigidPlacement) -> Option<Self> {
        if !self.supports_duplication() {
            return None;
        }
        Some(Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            placement,
        })
    }

    fn element_name(&self) -> String {
        self.to_string()
    }
}
