//! Structural elements module

mod beam;
mod dof;
mod joint;
mod load;
mod material;
mod node;
mod plate;
mod support;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use beam::{Beam, Colour};
pub use dof::{Dof, DofMask};
pub use joint::Joint;
pub use load::{Load, LoadTarget};
pub use material::{BeamSection, Material, IMPLICIT_PROPERTY};
pub use node::{Node, NodeOrigin};
pub use plate::Plate;
pub use support::{LocalFrame, Support, SupportLocation};

/// Stable type tag of an element kind.
///
/// The declaration order is the extraction precedence used when a mixed
/// collection is sorted into typed buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Node,
    Beam,
    Plate,
    Support,
    Joint,
    Load,
    Material,
}

impl ElementType {
    /// All kinds in extraction precedence order
    pub const PRECEDENCE: [ElementType; 7] = [
        ElementType::Node,
        ElementType::Beam,
        ElementType::Plate,
        ElementType::Support,
        ElementType::Joint,
        ElementType::Load,
        ElementType::Material,
    ];

    /// Persistent identifier of the kind, stable across releases
    pub const fn guid(self) -> Uuid {
        match self {
            Self::Node => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0001),
            Self::Beam => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0002),
            Self::Plate => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0003),
            Self::Support => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0004),
            Self::Joint => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0005),
            Self::Load => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0006),
            Self::Material => Uuid::from_u128(0x6a3f_1c20_8d4e_4b71_9f0a_01d2_c3b4_0007),
        }
    }

    /// Look a kind up by its persistent identifier
    pub fn from_guid(guid: Uuid) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|kind| kind.guid() == guid)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Beam => "Beam",
            Self::Plate => "Plate",
            Self::Support => "Support",
            Self::Joint => "Joint",
            Self::Load => "Load",
            Self::Material => "Material",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any one of the seven engineering entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Element {
    Node(Node),
    Beam(Beam),
    Plate(Plate),
    Support(Support),
    Joint(Joint),
    Load(Load),
    Material(Material),
}

impl Element {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Node(_) => ElementType::Node,
            Self::Beam(_) => ElementType::Beam,
            Self::Plate(_) => ElementType::Plate,
            Self::Support(_) => ElementType::Support,
            Self::Joint(_) => ElementType::Joint,
            Self::Load(_) => ElementType::Load,
            Self::Material(_) => ElementType::Material,
        }
    }

    /// Semantic validity of the wrapped entity
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Node(v) => v.is_valid(),
            Self::Beam(v) => v.is_valid(),
            Self::Plate(v) => v.is_valid(),
            Self::Support(v) => v.is_valid(),
            Self::Joint(v) => v.is_valid(),
            Self::Load(v) => v.is_valid(),
            Self::Material(v) => v.is_valid(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(v) => {
                let p = v.position;
                write!(f, "Node {} ({:.4}, {:.4}, {:.4})", v.id, p.x, p.y, p.z)
            }
            Self::Beam(v) => write!(f, "Beam {} [{} -> {}]", v.id, v.nodes[0], v.nodes[1]),
            Self::Plate(v) => write!(f, "Plate {} {:?}", v.id, v.nodes),
            Self::Support(v) => write!(f, "Support {} at {}", v.dofs, v.location_label()),
            Self::Joint(v) => write!(f, "Joint {} releases {}", v.id, v.releases),
            Self::Load(v) => write!(f, "Load case {} at {}", v.case, v.target_label()),
            Self::Material(v) => write!(f, "Material {} '{}'", v.id, v.name),
        }
    }
}

/// A concrete element kind that can be stored in and recovered from an [`Element`]
pub trait ElementKind: Clone + Sized + 'static {
    const TYPE: ElementType;

    /// Borrow the value if `element` holds exactly this kind
    fn from_element(element: &Element) -> Option<&Self>;

    fn into_element(self) -> Element;

    fn is_valid(&self) -> bool;
}

macro_rules! element_kind {
    ($ty:ident) => {
        impl ElementKind for $ty {
            const TYPE: ElementType = ElementType::$ty;

            fn from_element(element: &Element) -> Option<&Self> {
                match element {
                    Element::$ty(value) => Some(value),
                    _ => None,
                }
            }

            fn into_element(self) -> Element {
                Element::$ty(self)
            }

            fn is_valid(&self) -> bool {
                $ty::is_valid(self)
            }
        }

        impl From<$ty> for Element {
            fn from(value: $ty) -> Self {
                Element::$ty(value)
            }
        }
    };
}

element_kind!(Node);
element_kind!(Beam);
element_kind!(Plate);
element_kind!(Support);
element_kind!(Joint);
element_kind!(Load);
element_kind!(Material);

pub(crate) fn is_finite_point(p: &nalgebra::Point3<f64>) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}
