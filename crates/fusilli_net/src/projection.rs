//! Wire projection of components.
//!
//! A component's wire form is the CBOR map of its non-null public fields.
//! Updates carry `id` plus only the fields whose projected values differ from
//! the client snapshot; the comparison is top-level field-wise, so a nested
//! record change is reported as a whole-field replacement.

use ciborium::Value;

use fusilli_types::{AnyId, Component};

use crate::codec;
use crate::error::NetError;

/// Project a component to its full wire map.
///
/// Behavior-override state never reaches this function: the scene engine
/// always projects the base component.
///
/// # Errors
///
/// Returns [`NetError::ToValue`] if the component cannot be represented.
pub fn component_value(component: &Component) -> Result<Value, NetError> {
    match component {
        Component::Method(c) => codec::to_value(c),
        Component::Signal(c) => codec::to_value(c),
        Component::Entity(c) => codec::to_value(c),
        Component::Plot(c) => codec::to_value(c),
        Component::Buffer(c) => codec::to_value(c),
        Component::BufferView(c) => codec::to_value(c),
        Component::Material(c) => codec::to_value(c),
        Component::Image(c) => codec::to_value(c),
        Component::Texture(c) => codec::to_value(c),
        Component::Sampler(c) => codec::to_value(c),
        Component::Light(c) => codec::to_value(c),
        Component::Geometry(c) => codec::to_value(c),
        Component::Table(c) => codec::to_value(c),
    }
}

/// The `{id}` content of a delete message.
///
/// # Errors
///
/// Returns [`NetError::ToValue`] if the identifier cannot be represented.
pub fn id_content(id: AnyId) -> Result<Value, NetError> {
    Ok(Value::Map(vec![(
        Value::Text("id".to_string()),
        codec::to_value(&id.id)?,
    )]))
}

/// Fields of `current` whose values differ from `previous`, excluding `id`.
///
/// Both arguments must be projected wire maps. Fields present only in
/// `previous` (i.e. fields that became null) are not reported — they simply
/// drop out of the projection, and clients keep their last value.
///
/// # Errors
///
/// Returns [`NetError::MalformedFrame`] if either value is not a map.
pub fn map_delta(previous: &Value, current: &Value) -> Result<Vec<(Value, Value)>, NetError> {
    let previous = as_map(previous)?;
    let current = as_map(current)?;
    let mut changed = Vec::new();
    for (key, value) in current {
        if key.as_text() == Some("id") {
            continue;
        }
        let old = previous
            .iter()
            .find(|(previous_key, _)| previous_key == key)
            .map(|(_, previous_value)| previous_value);
        if old != Some(value) {
            changed.push((key.clone(), value.clone()));
        }
    }
    Ok(changed)
}

/// Assemble the content of an update message: `id` plus the changed fields.
///
/// # Errors
///
/// Returns [`NetError::ToValue`] if the identifier cannot be represented.
pub fn update_content(id: AnyId, delta: Vec<(Value, Value)>) -> Result<Value, NetError> {
    let mut entries = Vec::with_capacity(delta.len() + 1);
    entries.push((Value::Text("id".to_string()), codec::to_value(&id.id)?));
    entries.extend(delta);
    Ok(Value::Map(entries))
}

fn as_map(value: &Value) -> Result<&Vec<(Value, Value)>, NetError> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(NetError::MalformedFrame(
            "component projection is not a map".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusilli_types::{Entity, EntityId};

    fn keys(value: &Value) -> Vec<String> {
        let Value::Map(entries) = value else {
            panic!("expected a map");
        };
        entries
            .iter()
            .filter_map(|(key, _)| key.as_text().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_projection_omits_null_fields() {
        let component = Component::Entity(Entity {
            id: EntityId::new(0, 0),
            name: Some("a".to_string()),
            ..Entity::default()
        });
        let value = component_value(&component).unwrap();
        assert_eq!(keys(&value), vec!["id", "name"]);
    }

    #[test]
    fn test_delta_reports_only_changed_fields() {
        let before = Component::Entity(Entity {
            id: EntityId::new(0, 0),
            name: Some("a".to_string()),
            tags: Some(vec!["x".to_string()]),
            ..Entity::default()
        });
        let mut after_entity = Entity {
            id: EntityId::new(0, 0),
            name: Some("b".to_string()),
            tags: Some(vec!["x".to_string()]),
            ..Entity::default()
        };
        let previous = component_value(&before).unwrap();
        let current = component_value(&Component::Entity(after_entity.clone())).unwrap();
        let delta = map_delta(&previous, &current).unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].0, Value::Text("name".to_string()));

        // Unchanged projection produces an empty delta.
        after_entity.name = Some("a".to_string());
        let unchanged = component_value(&Component::Entity(after_entity)).unwrap();
        assert!(map_delta(&previous, &unchanged).unwrap().is_empty());
    }

    #[test]
    fn test_field_dropped_to_null_is_not_reported() {
        let before = Component::Entity(Entity {
            id: EntityId::new(0, 0),
            name: Some("a".to_string()),
            ..Entity::default()
        });
        let after = Component::Entity(Entity {
            id: EntityId::new(0, 0),
            name: None,
            ..Entity::default()
        });
        let previous = component_value(&before).unwrap();
        let current = component_value(&after).unwrap();
        assert!(map_delta(&previous, &current).unwrap().is_empty());
    }

    #[test]
    fn test_update_content_leads_with_id() {
        let id: AnyId = EntityId::new(2, 1).into();
        let content = update_content(
            id,
            vec![(Value::Text("name".into()), Value::Text("b".into()))],
        )
        .unwrap();
        assert_eq!(keys(&content), vec!["id", "name"]);
    }
}
