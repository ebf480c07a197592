//! Pattern clone orchestration.
//!
//! Turns one seed element into `count` positioned instances. Instance 0 is
//! the seed itself; every further instance is a duplicate of the seed's
//! payload carrying the placement computed by the pattern. The caller owns
//! the resulting collection.

use std::sync::Arc;

use kaleido_geometry::RigidPlacement;
use log::debug;

use crate::pattern::{ClonePattern, PatternError, PatternGeometry, MAX_INSTANCES};

/// Capability of an element that can be repeated by a pattern.
pub trait ClonableElement: Sized {
    /// Current placement of the element.
    fn placement(&self) -> &RigidPlacement;

    /// Whether [`duplicate_with`](Self::duplicate_with) is supported.
    fn supports_duplication(&self) -> bool {
        true
    }

    /// A copy of this element, keeping its type-specific state, moved to
    /// `placement`. Returns `None` when the element cannot be duplicated.
    fn duplicate_with(&self, placement: RigidPlacement) -> Option<Self>;

    /// Name used in diagnostics.
    fn element_name(&self) -> String {
        std::any::type_name::<Self>().to_owned()
    }
}

/// One generated instance of a seed element.
#[derive(Debug)]
pub struct ClonedInstance<E> {
    pub index: usize,
    pub placement: RigidPlacement,
    pub payload: Arc<E>,
}

impl<E> ClonedInstance<E> {
    /// Whether this is the seed rather than a generated copy.
    pub fn is_seed(&self) -> bool {
        self.index == 0
    }
}

impl<E> Clone for ClonedInstance<E> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            placement: self.placement.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

/// Generate `count` instances of `seed` through `pattern`.
///
/// Fails without producing anything when `count` is zero or above
/// [`MAX_INSTANCES`], or when copies are needed and the seed cannot be
/// duplicated. The seed is never modified.
pub fn clone_pattern<E: ClonableElement>(
    seed: &Arc<E>,
    pattern: &ClonePattern,
    count: usize,
) -> Result<Vec<ClonedInstance<E>>, PatternError> {
    if !(1..=MAX_INSTANCES).contains(&count) {
        return Err(PatternError::InvalidInstanceCount { count });
    }
    if count > 1 && !seed.supports_duplication() {
        return Err(PatternError::PayloadNotClonable {
            element: seed.element_name(),
        });
    }

    debug!(
        "Cloning '{}' through {} pattern: {} instances",
        seed.element_name(),
        pattern.kind(),
        count
    );

    let base = pattern.pattern_matrix();
    let seed_placement = seed.placement();
    let mut instances = Vec::with_capacity(count);

    for index in 0..count {
        let placement = pattern.instance_transform(&base, seed_placement, index);
        let payload = if index == 0 {
            Arc::clone(seed)
        } else {
            let copy = seed.duplicate_with(placement.clone()).ok_or_else(|| {
                PatternError::PayloadNotClonable {
                    element: seed.element_name(),
                }
            })?;
            Arc::new(copy)
        };
        instances.push(ClonedInstance {
            index,
            placement,
            payload,
        });
    }

    Ok(instances)
}

/// Like [`clone_pattern`], handing the instances to an owning collection.
///
/// Nothing is added to `sink` if cloning fails.
pub fn clone_pattern_into<E, C>(
    seed: &Arc<E>,
    pattern: &ClonePattern,
    count: usize,
    sink: &mut C,
) -> Result<usize, PatternError>
where
    E: ClonableElement,
    C: Extend<ClonedInstance<E>>,
{
    let instances = clone_pattern(seed, pattern, count)?;
    let added = instances.len();
    sink.extend(instances);
    Ok(added)
}
