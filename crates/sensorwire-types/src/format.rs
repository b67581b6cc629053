//! JSON rendering of entities for notification payloads.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::entity::{Attribute, Entity, Related};
use crate::enums::Property;

/// Key carrying the entity identifier.
pub const ID_KEY: &str = "@iot.id";
/// Key carrying the absolute entity URL.
pub const SELF_LINK_KEY: &str = "@iot.selfLink";
/// Suffix appended to a navigation property name for its link.
pub const NAVIGATION_LINK_SUFFIX: &str = "@iot.navigationLink";

/// Render `entity` as a JSON object.
///
/// An empty `selection` renders the full entity: identifier, self link,
/// every set attribute, a navigation link for each referenced entity, and
/// expanded entities inline. A non-empty selection renders only the listed
/// properties; selected attributes that are not set come out as `null`.
pub fn format_entity(
    entity: &Entity,
    service_root_url: &str,
    selection: &BTreeSet<Property>,
) -> Value {
    let mut out = Map::new();
    let full = selection.is_empty();
    let wants = |p: Property| full || selection.contains(&p);
    let self_link = entity.self_link(service_root_url);

    if wants(Property::Id) {
        out.insert(
            ID_KEY.to_owned(),
            entity.id().map_or(Value::Null, |id| Value::from(id.into_inner())),
        );
    }
    if wants(Property::SelfLink) {
        out.insert(
            SELF_LINK_KEY.to_owned(),
            self_link.clone().map_or(Value::Null, Value::String),
        );
    }

    let entity_type = entity.entity_type();
    for &property in entity_type.attributes() {
        if !wants(property) {
            continue;
        }
        match entity.get(property) {
            Some(attribute) => {
                out.insert(property.name().to_owned(), attribute.to_json());
            }
            None if !full => {
                out.insert(property.name().to_owned(), Value::Null);
            }
            None => {}
        }
    }

    for &property in entity_type.navigation_properties() {
        if !wants(property) {
            continue;
        }
        match entity.get(property) {
            Some(Attribute::Related(Related::Full(related))) => {
                out.insert(
                    property.name().to_owned(),
                    format_entity(related, service_root_url, &BTreeSet::new()),
                );
            }
            Some(Attribute::Related(Related::Reference { .. })) => {
                if let Some(link) = &self_link {
                    out.insert(
                        format!("{}{NAVIGATION_LINK_SUFFIX}", property.name()),
                        Value::String(format!("{link}/{}", property.name())),
                    );
                }
            }
            _ => {}
        }
    }

    Value::Object(out)
}

/// Resolve `$select` style names against the properties of `entity`'s
/// type. Unknown names are ignored.
pub fn resolve_selection<'a, I>(entity: &Entity, names: I) -> BTreeSet<Property>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(Property::from_name)
        .filter(|p| entity.entity_type().has_property(*p))
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::enums::EntityType;
    use crate::ids::EntityId;
    use crate::result::{Number, ResultValue};

    const ROOT: &str = "http://localhost:8080/sensorwire/v1.0";

    fn observation() -> Entity {
        Entity::new(EntityType::Observation)
            .with_id(EntityId::new(42))
            .with(
                Property::Result,
                Attribute::Result(ResultValue::Number(Number::Exact(dec!(21.5)))),
            )
            .with(
                Property::Datastream,
                Attribute::Related(Related::reference(EntityType::Datastream, EntityId::new(7))),
            )
    }

    #[test]
    fn full_entity_carries_links() {
        let value = format_entity(&observation(), ROOT, &BTreeSet::new());
        assert_eq!(
            value,
            json!({
                "@iot.id": 42,
                "@iot.selfLink": "http://localhost:8080/sensorwire/v1.0/Observations(42)",
                "result": 21.5,
                "Datastream@iot.navigationLink":
                    "http://localhost:8080/sensorwire/v1.0/Observations(42)/Datastream",
            })
        );
    }

    #[test]
    fn selection_restricts_output() {
        let entity = observation();
        let selection = resolve_selection(&entity, ["result", "parameters", "colour"]);
        let value = format_entity(&entity, ROOT, &selection);
        assert_eq!(value, json!({"result": 21.5, "parameters": null}));
    }

    #[test]
    fn expanded_entities_are_inlined() {
        let thing = Entity::new(EntityType::Thing)
            .with_id(EntityId::new(1))
            .with(Property::Name, Attribute::Text("kiln".to_owned()));
        let location = Entity::new(EntityType::HistoricalLocation)
            .with_id(EntityId::new(3))
            .with(Property::Thing, Attribute::Related(Related::Full(Box::new(thing))));
        let selection = BTreeSet::from([Property::Thing]);
        let value = format_entity(&location, ROOT, &selection);
        assert_eq!(value["Thing"]["name"], json!("kiln"));
        assert_eq!(value["Thing"]["@iot.id"], json!(1));
    }
}
