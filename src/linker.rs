//! Property-based entry point.
//!
//! Resolves which entity properties hold geometries from a link expression
//! such as `top_intersects(x.geom, y.geom)`, decodes those properties from
//! WKT and runs the join.

use crate::config::JoinConfig;
use crate::decode::{GeometryFormat, decode_collection};
use crate::error::{JoinError, Result};
use crate::join::{GeometryMap, SpatialJoin};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use topolink_types::{Mapping, Relation};

/// Read access to entities and their property values.
pub trait EntityStore {
    fn entity_ids(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// All values of `property` on entity `id`, in insertion order.
    fn property_values(&self, id: &str, property: &str) -> &[String];
}

/// In-memory entity store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entities: FxHashMap<String, FxHashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: &str, property: &str, value: impl Into<String>) {
        self.entities
            .entry(id.to_string())
            .or_default()
            .entry(property.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityStore for MemoryStore {
    fn entity_ids(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.entities.keys().map(String::as_str))
    }

    fn property_values(&self, id: &str, property: &str) -> &[String] {
        self.entities
            .get(id)
            .and_then(|properties| properties.get(property))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A parsed link expression: `measure(x.source_property, y.target_property)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub measure: String,
    pub source_property: String,
    pub target_property: String,
}

impl LinkSpec {
    /// Relation named by a `top_*` measure, e.g. `top_within` -> within.
    pub fn relation(&self) -> Option<Relation> {
        self.measure
            .to_ascii_lowercase()
            .strip_prefix("top_")?
            .parse()
            .ok()
    }

    fn property(argument: &str) -> Result<String> {
        let argument = argument.trim();
        // strip the variable, keep the property path
        let property = match argument.split_once('.') {
            Some((_, property)) => property.trim(),
            None => argument,
        };
        if property.is_empty() {
            return Err(JoinError::InvalidExpression(format!(
                "empty property in argument {:?}",
                argument
            )));
        }
        Ok(property.to_string())
    }
}

impl FromStr for LinkSpec {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (measure, rest) = s
            .split_once('(')
            .ok_or_else(|| JoinError::InvalidExpression(format!("missing '(' in {:?}", s)))?;
        let arguments = rest
            .strip_suffix(')')
            .ok_or_else(|| JoinError::InvalidExpression(format!("missing ')' in {:?}", s)))?;

        let measure = measure.trim();
        if measure.is_empty() {
            return Err(JoinError::InvalidExpression(format!(
                "missing measure name in {:?}",
                s
            )));
        }

        let arguments: Vec<&str> = arguments.split(',').collect();
        let [source, target] = arguments.as_slice() else {
            return Err(JoinError::InvalidExpression(format!(
                "expected two arguments in {:?}, got {}",
                s,
                arguments.len()
            )));
        };

        Ok(Self {
            measure: measure.to_string(),
            source_property: Self::property(source)?,
            target_property: Self::property(target)?,
        })
    }
}

/// Decode the first value of `property` on every entity as WKT.
///
/// Entities without the property are left out; malformed values are skipped
/// with a warning.
pub fn geometries_from_store<S: EntityStore + ?Sized>(store: &S, property: &str) -> GeometryMap {
    let records = store.entity_ids().filter_map(|id| {
        store
            .property_values(id, property)
            .first()
            .map(|wkt| (id, wkt.as_str()))
    });
    decode_collection(records, GeometryFormat::Wkt)
}

/// Link the entities of two stores on a topological relation.
///
/// `threshold` only gates the call: it must be strictly positive, and every
/// returned link has confidence `1.0`.
pub fn map_entities<S, T>(
    source: &S,
    target: &T,
    expression: &str,
    threshold: f64,
    relation: &Relation,
    config: JoinConfig,
) -> Result<Mapping>
where
    S: EntityStore + ?Sized,
    T: EntityStore + ?Sized,
{
    if !(threshold > 0.0) {
        return Err(JoinError::InvalidThreshold(threshold));
    }
    let link: LinkSpec = expression.parse()?;

    let source_geometries = geometries_from_store(source, &link.source_property);
    let target_geometries = geometries_from_store(target, &link.target_property);
    log::debug!(
        "linking {} source and {} target geometries on {}",
        source_geometries.len(),
        target_geometries.len(),
        relation
    );

    SpatialJoin::new(config).join_relation(&source_geometries, &target_geometries, relation)
}
