//! Sorting mixed element collections into typed buckets

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::batch::{ElementCounts, ModelBatch};
use crate::container::ElementContainer;
use crate::elements::{Element, ElementType};
use crate::error::{LinkError, LinkResult};

/// What to do with items that do not end up in a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassifyPolicy {
    /// Drop them and report counts
    #[default]
    Lenient,
    /// Fail the whole classification
    Strict,
}

/// Result of classifying a mixed collection.
///
/// Buckets keep the caller's relative order within each kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub batch: ModelBatch,
    /// Items matching no known kind (including empty containers)
    pub skipped_count: usize,
    /// Items of a known kind whose value failed its validity check
    pub invalid_count: usize,
}

impl Classification {
    pub fn count(&self, kind: ElementType) -> usize {
        self.batch.counts().get(kind)
    }

    /// Number of classified elements across all buckets
    pub fn total(&self) -> usize {
        self.batch.counts().total()
    }

    pub fn counts(&self) -> ElementCounts {
        self.batch.counts()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped_count == 0 && self.invalid_count == 0
    }

    pub fn into_batch(self) -> ModelBatch {
        self.batch
    }

    fn admit(&mut self, element: &Element) {
        if element.is_valid() {
            self.batch.push(element.clone());
        } else {
            log::debug!("Dropping invalid {}: {element}", element.element_type());
            self.invalid_count += 1;
        }
    }
}

impl From<Classification> for ModelBatch {
    fn from(classification: Classification) -> Self {
        classification.batch
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Classified {}", self.counts())?;
        if self.skipped_count > 0 {
            write!(f, "; skipped {} unrecognised item(s)", self.skipped_count)?;
        }
        if self.invalid_count > 0 {
            write!(f, "; dropped {} invalid element(s)", self.invalid_count)?;
        }
        Ok(())
    }
}

/// Classify containers, dropping anything that cannot be used
pub fn classify(items: &[ElementContainer]) -> Classification {
    let mut out = Classification::default();
    for item in items {
        match item.element() {
            Some(element) => out.admit(element),
            None => out.skipped_count += 1,
        }
    }
    if !out.is_clean() {
        log::warn!("{out}");
    }
    out
}

/// Classify containers under an explicit policy
pub fn classify_with(
    items: &[ElementContainer],
    policy: ClassifyPolicy,
) -> LinkResult<Classification> {
    strict_check(classify(items), policy)
}

/// Classify opaque host values; values of unknown types count as skipped
pub fn classify_any<'a, I>(items: I, policy: ClassifyPolicy) -> LinkResult<Classification>
where
    I: IntoIterator<Item = &'a dyn Any>,
{
    let mut out = Classification::default();
    for item in items {
        match ElementContainer::wrap_any(item) {
            Ok(container) => match container.element() {
                Some(element) => out.admit(element),
                None => out.skipped_count += 1,
            },
            Err(err) => {
                log::debug!("Skipping item: {err}");
                out.skipped_count += 1;
            }
        }
    }
    strict_check(out, policy)
}

fn strict_check(out: Classification, policy: ClassifyPolicy) -> LinkResult<Classification> {
    if policy == ClassifyPolicy::Strict && !out.is_clean() {
        return Err(LinkError::Conversion {
            expected: "valid elements only".to_string(),
            found: format!(
                "{} skipped and {} invalid item(s)",
                out.skipped_count, out.invalid_count
            ),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Beam, Load, LoadTarget, Node, Plate, Support, SupportLocation};
    use nalgebra::Vector3;

    fn mixed() -> Vec<ElementContainer> {
        vec![
            ElementContainer::wrap(Node::new(1, 0.0, 0.0, 0.0)),
            ElementContainer::wrap(Beam::new(1, 1, 2)),
            ElementContainer::wrap(Node::new(2, 1.0, 0.0, 0.0)),
            ElementContainer::wrap(Plate::new(1, vec![1, 2, 3])),
            ElementContainer::wrap(Node::new(3, 0.0, 1.0, 0.0)),
            ElementContainer::wrap(Beam::new(2, 2, 3)),
        ]
    }

    #[test]
    fn test_round_trip_counts() {
        let items = mixed();
        let out = classify(&items);
        assert_eq!(out.count(ElementType::Node), 3);
        assert_eq!(out.count(ElementType::Beam), 2);
        assert_eq!(out.count(ElementType::Plate), 1);
        assert_eq!(out.total(), items.len());
        assert!(out.is_clean());
    }

    #[test]
    fn test_relative_order_preserved() {
        let out = classify(&mixed());
        let ids: Vec<u32> = out.batch.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let ids: Vec<u32> = out.batch.beams.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_skipped_and_invalid_are_separate() {
        let mut homeless = Support::pinned(SupportLocation::Node(1));
        homeless.location = None;

        let mut items = mixed();
        items.push(ElementContainer::empty());
        items.push(ElementContainer::wrap(homeless));
        items.push(ElementContainer::wrap(Load::force(
            LoadTarget::Node(2),
            Vector3::new(0.0, 0.0, -1.0),
            1,
        )));

        let out = classify(&items);
        assert_eq!(out.skipped_count, 1);
        assert_eq!(out.invalid_count, 1);
        assert_eq!(out.count(ElementType::Support), 0);
        assert_eq!(out.count(ElementType::Load), 1);
        assert!(out.to_string().contains("skipped 1"));

        let err = classify_with(&items, ClassifyPolicy::Strict).unwrap_err();
        assert!(matches!(err, LinkError::Conversion { .. }));
        assert!(classify_with(&mixed(), ClassifyPolicy::Strict).is_ok());
    }

    #[test]
    fn test_classify_opaque_values() {
        let node = Node::new(1, 0.0, 0.0, 0.0);
        let text = String::from("not an element");
        let beam = ElementContainer::wrap(Beam::new(1, 1, 2));
        let items: Vec<&dyn Any> = vec![&node, &text, &beam];

        let out = classify_any(items.iter().copied(), ClassifyPolicy::Lenient).unwrap();
        assert_eq!(out.total(), 2);
        assert_eq!(out.skipped_count, 1);
        assert!(classify_any(items, ClassifyPolicy::Strict).is_err());
    }
}
