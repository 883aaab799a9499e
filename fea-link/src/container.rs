//! Single-entity polymorphic box for host-supplied values

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::elements::{
    Beam, Element, ElementKind, ElementType, Joint, Load, Material, Node, Plate, Support,
};
use crate::error::{LinkError, LinkResult};

/// Holds at most one engineering entity together with its type tag.
///
/// The wrapped value is frozen: duplicates share it and no API hands out a
/// mutable reference, so one copy can never observe changes made through
/// another.
#[derive(Debug, Clone, Default)]
pub struct ElementContainer {
    value: Option<Arc<Element>>,
}

impl ElementContainer {
    /// An empty container
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn wrap(value: impl Into<Element>) -> Self {
        Self {
            value: Some(Arc::new(value.into())),
        }
    }

    /// Wrap an opaque host value.
    ///
    /// Accepts the seven entity types, an [`Element`], or another container
    /// (which is duplicated).
    pub fn wrap_any(value: &dyn Any) -> LinkResult<Self> {
        macro_rules! try_kind {
            ($($ty:ty),*) => {
                $(
                    if let Some(v) = value.downcast_ref::<$ty>() {
                        return Ok(Self::wrap(v.clone()));
                    }
                )*
            };
        }
        try_kind!(Node, Beam, Plate, Support, Joint, Load, Material);

        if let Some(element) = value.downcast_ref::<Element>() {
            return Ok(Self::wrap(element.clone()));
        }
        if let Some(container) = value.downcast_ref::<ElementContainer>() {
            return Ok(container.duplicate());
        }
        Err(LinkError::UnsupportedType(describe_opaque(value)))
    }

    /// A container sharing this one's frozen value
    pub fn duplicate(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.value.as_deref().map(Element::element_type)
    }

    pub fn element(&self) -> Option<&Element> {
        self.value.as_deref()
    }

    /// Borrow the value if the stored tag is exactly `K`
    pub fn get<K: ElementKind>(&self) -> Option<&K> {
        self.value.as_deref().and_then(K::from_element)
    }

    /// Copy the value out if the stored tag is exactly `K`
    pub fn try_as<K: ElementKind>(&self) -> Option<K> {
        self.get::<K>().cloned()
    }

    /// Like [`Self::try_as`], reporting the mismatch
    pub fn cast<K: ElementKind>(&self) -> LinkResult<K> {
        self.try_as::<K>().ok_or_else(|| LinkError::Conversion {
            expected: K::TYPE.to_string(),
            found: self.type_label(),
        })
    }

    fn type_label(&self) -> String {
        self.element_type()
            .map_or_else(|| "empty container".to_string(), |t| t.to_string())
    }
}

impl PartialEq for ElementContainer {
    fn eq(&self, other: &Self) -> bool {
        self.value.as_deref() == other.value.as_deref()
    }
}

impl fmt::Display for ElementContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_deref() {
            Some(element) => write!(f, "{element}"),
            None => f.write_str("Null element"),
        }
    }
}

fn describe_opaque(value: &dyn Any) -> String {
    macro_rules! named {
        ($($ty:ty),*) => {
            $(
                if value.is::<$ty>() {
                    return std::any::type_name::<$ty>().to_string();
                }
            )*
        };
    }
    named!(String, &'static str, f64, f32, i32, i64, u32, u64, usize, bool);
    format!("{:?}", value.type_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{DofMask, SupportLocation};

    #[test]
    fn test_wrap_and_cast() {
        let c = ElementContainer::wrap(Node::new(1, 0.0, 0.0, 0.0));
        assert!(c.is_valid());
        assert_eq!(c.element_type(), Some(ElementType::Node));
        assert_eq!(c.try_as::<Node>().unwrap().id, 1);
        assert!(c.try_as::<Beam>().is_none());
    }

    #[test]
    fn test_support_never_casts_to_joint() {
        let c = ElementContainer::wrap(Support::at_node(3, DofMask::rotations()));
        assert!(c.try_as::<Joint>().is_none());
        let err = c.cast::<Joint>().unwrap_err();
        match err {
            LinkError::Conversion { expected, found } => {
                assert_eq!(expected, "Joint");
                assert_eq!(found, "Support");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(c.cast::<Support>().is_ok());
    }

    #[test]
    fn test_wrap_any() {
        let beam = Beam::new(2, 1, 2);
        let c = ElementContainer::wrap_any(&beam).unwrap();
        assert_eq!(c.try_as::<Beam>(), Some(beam));

        let again = ElementContainer::wrap_any(&c).unwrap();
        assert_eq!(again, c);

        let element = Element::from(Joint::hinge(1));
        assert_eq!(
            ElementContainer::wrap_any(&element).unwrap().element_type(),
            Some(ElementType::Joint)
        );

        let err = ElementContainer::wrap_any(&42_i32).unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedType(ref name) if name == "i32"));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let original = ElementContainer::wrap(Support::pinned(SupportLocation::Node(1)));
        let mut copy = original.duplicate();
        assert_eq!(copy, original);

        // Replacing the copy's value leaves the original untouched
        copy = ElementContainer::wrap(Support::fixed(SupportLocation::Node(1)));
        assert_ne!(copy, original);
        assert_eq!(original.get::<Support>().unwrap().dofs, DofMask::pinned());
    }

    #[test]
    fn test_equality_by_value() {
        let a = ElementContainer::wrap(Node::new(5, 1.0, 2.0, 3.0));
        let b = ElementContainer::wrap(Node::new(5, 1.0, 2.0, 3.0));
        assert_eq!(a, b);
        assert_eq!(ElementContainer::empty(), ElementContainer::empty());
        assert_ne!(a, ElementContainer::empty());
    }

    #[test]
    fn test_empty_container() {
        let c = ElementContainer::empty();
        assert!(!c.is_valid());
        assert_eq!(c.to_string(), "Null element");
        assert!(matches!(c.cast::<Node>(), Err(LinkError::Conversion { .. })));
    }
}
