//! Dimension resolution: span attribute -> resource attribute -> default.

use crate::config::Dimension;
use crate::span::{AttributeValue, Attributes};

/// Resolve one configured dimension for a span, given its own attributes and
/// its resource's attributes. Returns `None` when the dimension contributes
/// nothing (no match anywhere, and no default configured).
pub fn resolve_dimension(
    dimension: &Dimension,
    span_attributes: Option<&Attributes>,
    resource_attributes: &Attributes,
) -> Option<AttributeValue> {
    if let Some(span_attributes) = span_attributes {
        if let Some(value) = span_attributes.get(&dimension.name) {
            return Some(value.clone());
        }
    }
    if let Some(value) = resource_attributes.get(&dimension.name) {
        return Some(value.clone());
    }
    dimension
        .default
        .as_ref()
        .map(|default| AttributeValue::String(default.clone()))
}
