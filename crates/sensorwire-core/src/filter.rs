//! Subscription filters and their evaluation.
//!
//! Filters are derived from the topic path: an entity topic matches one id,
//! a related-collection topic matches entities whose navigation property
//! points at one parent. Evaluation goes through [`FilterEvaluator`] so a
//! richer predicate engine can be slotted in.

use sensorwire_types::{Entity, EntityId, Property, Related};

use crate::error::FilterError;

/// A predicate on a changed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// The entity's own id equals the given id.
    IdEquals(EntityId),
    /// The entity's `navigation` property references the given id.
    RelatedIdEquals {
        /// The to-one navigation property followed.
        navigation: Property,
        /// Id the referenced entity must have.
        id: EntityId,
    },
}

/// Evaluates a [`Filter`] against an entity.
pub trait FilterEvaluator: Send + Sync {
    /// Whether `entity` satisfies `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] when the filter cannot be evaluated for
    /// this entity. Callers treat that as a non-match.
    fn evaluate(&self, filter: &Filter, entity: &Entity) -> Result<bool, FilterError>;
}

/// Evaluator for the path-derived filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEvaluator;

impl FilterEvaluator for BuiltinEvaluator {
    fn evaluate(&self, filter: &Filter, entity: &Entity) -> Result<bool, FilterError> {
        match *filter {
            Filter::IdEquals(id) => entity
                .id()
                .map(|own| own == id)
                .ok_or(FilterError::MissingIdentity {
                    entity_type: entity.entity_type(),
                }),
            Filter::RelatedIdEquals { navigation, id } => {
                if !entity
                    .entity_type()
                    .navigation_properties()
                    .contains(&navigation)
                {
                    return Err(FilterError::UnsupportedNavigation {
                        entity_type: entity.entity_type(),
                        navigation,
                    });
                }
                Ok(entity
                    .related(navigation)
                    .and_then(Related::id)
                    .is_some_and(|related| related == id))
            }
        }
    }
}
