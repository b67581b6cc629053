//! Generic row materializer.
//!
//! One function serves every entity type: it reads the primary key, then
//! walks the type's [`schema`](crate::schema) table and decodes each
//! property from its columns. Absent values leave the attribute unset.

use std::collections::BTreeSet;

use sensorwire_types::{
    Attribute, Entity, EntityId, EntityType, Property, Related, TimeInstant, TimeValue,
    UnitOfMeasurement,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::resolve::{self, ResultColumns};
use crate::row::Row;
use crate::schema::{ID_COLUMN, Source, schema_for};

/// Materialize one storage row as an entity of `entity_type`.
///
/// A null primary key leaves the id unset. Columns missing from the row
/// read as null, so a row fetched for a subset of properties materializes
/// the subset.
pub fn materialize(row: &Row, entity_type: EntityType) -> Result<Entity, CodecError> {
    let mut entity = Entity::new(entity_type);
    entity.set_id(row.integer(ID_COLUMN)?.map(EntityId::new));

    for entry in schema_for(entity_type) {
        if let Some(value) = decode(row, entry.source)? {
            entity.set(entry.property, value);
        }
    }
    Ok(entity)
}

/// Materialize a batch of rows, stopping at the first corrupt one.
pub fn materialize_set<'a, I>(rows: I, entity_type: EntityType) -> Result<Vec<Entity>, CodecError>
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter()
        .map(|row| materialize(row, entity_type))
        .collect()
}

/// Columns that must be fetched to materialize `selected` properties of
/// `entity_type`.
///
/// An empty selection means every column. The primary key is always
/// included. Names that are not properties of the type are ignored.
pub fn columns_needed(
    entity_type: EntityType,
    selected: &BTreeSet<Property>,
) -> BTreeSet<&'static str> {
    let mut columns = BTreeSet::from([ID_COLUMN]);
    for entry in schema_for(entity_type) {
        if selected.is_empty() || selected.contains(&entry.property) {
            entry.source.collect_columns(&mut columns);
        }
    }
    columns
}

/// [`columns_needed`] for `$select` style property names.
pub fn columns_needed_by_name<'a, I>(entity_type: EntityType, names: I) -> BTreeSet<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let selected = names
        .into_iter()
        .filter_map(Property::from_name)
        .filter(|p| entity_type.has_property(*p))
        .collect::<BTreeSet<_>>();
    columns_needed(entity_type, &selected)
}

fn decode(row: &Row, source: Source) -> Result<Option<Attribute>, CodecError> {
    let value = match source {
        Source::Text(column) => row.text(column)?.map(|s| Attribute::Text(s.to_owned())),
        Source::JsonObject(column) => parse_json::<Option<Map<String, Value>>>(row, column)?
            .flatten()
            .map(Attribute::Object),
        Source::Json(column) => parse_json::<Value>(row, column)?
            .filter(|v| !v.is_null())
            .map(Attribute::Json),
        Source::TimeValue { start, end } => {
            resolve::time_value(row.timestamp(start)?, row.timestamp(end)?).map(Attribute::Time)
        }
        Source::BoundedInterval { start, end } => {
            match (row.timestamp(start)?, row.timestamp(end)?) {
                (Some(start), Some(end)) => resolve::interval(Some(start), Some(end))
                    .map(|i| Attribute::Time(TimeValue::Interval(i))),
                _ => None,
            }
        }
        Source::Instant(column) => Some(Attribute::Time(TimeValue::Instant(TimeInstant(
            row.timestamp(column)?,
        )))),
        Source::Geometry { encoding, value } => {
            let encoding_type = match encoding {
                Some(column) => row.text(column)?,
                None => None,
            };
            resolve::decode_geometry(encoding_type, row.text(value)?).map(Attribute::Geometry)
        }
        Source::Result => {
            let (discriminator, columns) = ResultColumns::read(row)?;
            resolve::decode_result(discriminator, &columns)?.map(Attribute::Result)
        }
        Source::UnitOfMeasurement {
            name,
            symbol,
            definition,
        } => Some(Attribute::Unit(UnitOfMeasurement {
            name: row.text(name)?.map(str::to_owned),
            symbol: row.text(symbol)?.map(str::to_owned),
            definition: row.text(definition)?.map(str::to_owned),
        })),
        Source::UnitList(column) => {
            parse_json::<Vec<UnitOfMeasurement>>(row, column)?.map(Attribute::Units)
        }
        Source::TextList(column) => {
            parse_json::<Vec<String>>(row, column)?.map(Attribute::TextList)
        }
        Source::Reference { column, target } => row
            .integer(column)?
            .map(|id| Attribute::Related(Related::reference(target, EntityId::new(id)))),
    };
    Ok(value)
}

fn parse_json<T: DeserializeOwned>(row: &Row, column: &str) -> Result<Option<T>, CodecError> {
    row.text(column)?
        .map(|text| {
            serde_json::from_str(text).map_err(|source| CodecError::CorruptJson {
                column: column.to_owned(),
                source,
            })
        })
        .transpose()
}
