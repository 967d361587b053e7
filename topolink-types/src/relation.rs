use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters allowed in a DE-9IM pattern.
const PATTERN_ALPHABET: &[u8] = b"TF*012";

/// Positions of the interior/boundary cells of a DE-9IM matrix
/// (II, IB, BI, BB). A pattern asking for any of them to be non-empty can
/// only hold between geometries that intersect.
const INTERSECTION_CELLS: [usize; 4] = [0, 1, 3, 4];

/// A topological relation between two geometries.
///
/// The eight named relations follow the OGC simple-features semantics. Any
/// other input is accepted as a nine character DE-9IM pattern, evaluated with
/// a generic relate-by-pattern predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Relation {
    Equals,
    Disjoint,
    Intersects,
    Touches,
    Crosses,
    Within,
    Contains,
    Overlaps,
    /// Upper-cased DE-9IM pattern, always nine characters of `TF*012`.
    Pattern(String),
}

/// Error returned when a relation name is neither a known relation nor a
/// well-formed DE-9IM pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown relation or malformed DE-9IM pattern: {0:?}")]
pub struct ParseRelationError(pub String);

impl Relation {
    /// Canonical lower-case name, or the pattern itself.
    pub fn as_str(&self) -> &str {
        match self {
            Relation::Equals => "equals",
            Relation::Disjoint => "disjoint",
            Relation::Intersects => "intersects",
            Relation::Touches => "touches",
            Relation::Crosses => "crosses",
            Relation::Within => "within",
            Relation::Contains => "contains",
            Relation::Overlaps => "overlaps",
            Relation::Pattern(p) => p,
        }
    }

    /// The relation that must hold for `(b, a)` whenever `self` holds for
    /// `(a, b)`.
    ///
    /// ```
    /// use topolink_types::Relation;
    ///
    /// assert_eq!(Relation::Within.swapped(), Relation::Contains);
    /// assert_eq!(Relation::Touches.swapped(), Relation::Touches);
    ///
    /// let p: Relation = "T*F**F***".parse().unwrap();
    /// assert_eq!(p.swapped().as_str(), "T*****FF*");
    /// ```
    pub fn swapped(&self) -> Relation {
        match self {
            Relation::Within => Relation::Contains,
            Relation::Contains => Relation::Within,
            Relation::Pattern(p) => {
                let cells = p.as_bytes();
                let transposed: String = (0..9)
                    .map(|i| cells[(i % 3) * 3 + i / 3] as char)
                    .collect();
                Relation::Pattern(transposed)
            }
            other => other.clone(),
        }
    }

    /// Whether the relation can only hold between geometries whose bounding
    /// boxes intersect. Relations for which this is false cannot be served by
    /// a grid filter.
    pub fn requires_intersection(&self) -> bool {
        match self {
            Relation::Disjoint => false,
            Relation::Pattern(p) => {
                let cells = p.as_bytes();
                INTERSECTION_CELLS
                    .iter()
                    .any(|&i| matches!(cells[i], b'T' | b'0' | b'1' | b'2'))
            }
            _ => true,
        }
    }

    fn parse_pattern(s: &str) -> Option<String> {
        let upper = s.to_ascii_uppercase();
        if upper.len() == 9 && upper.bytes().all(|b| PATTERN_ALPHABET.contains(&b)) {
            Some(upper)
        } else {
            None
        }
    }
}

impl FromStr for Relation {
    type Err = ParseRelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let relation = match trimmed.to_ascii_lowercase().as_str() {
            "equals" => Relation::Equals,
            "disjoint" => Relation::Disjoint,
            "intersects" => Relation::Intersects,
            "touches" => Relation::Touches,
            "crosses" => Relation::Crosses,
            "within" => Relation::Within,
            "contains" => Relation::Contains,
            "overlaps" => Relation::Overlaps,
            _ => Relation::Pattern(
                Self::parse_pattern(trimmed).ok_or_else(|| ParseRelationError(s.to_string()))?,
            ),
        };
        Ok(relation)
    }
}

impl TryFrom<String> for Relation {
    type Error = ParseRelationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Relation> for String {
    fn from(value: Relation) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_relations() {
        assert_eq!("intersects".parse::<Relation>().unwrap(), Relation::Intersects);
        assert_eq!(" Within ".parse::<Relation>().unwrap(), Relation::Within);
        assert_eq!("OVERLAPS".parse::<Relation>().unwrap(), Relation::Overlaps);
    }

    #[test]
    fn test_parse_pattern() {
        let relation: Relation = "t*f**f***".parse().unwrap();
        assert_eq!(relation, Relation::Pattern("T*F**F***".to_string()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("near".parse::<Relation>().is_err());
        assert!("T*F**F**".parse::<Relation>().is_err());
        assert!("T*F**F**X".parse::<Relation>().is_err());
    }

    #[test]
    fn test_swapped_twice_is_identity() {
        let p: Relation = "212101212".parse().unwrap();
        assert_eq!(p.swapped().swapped(), p);
        assert_eq!(Relation::Contains.swapped().swapped(), Relation::Contains);
    }

    #[test]
    fn test_requires_intersection() {
        assert!(Relation::Touches.requires_intersection());
        assert!(!Relation::Disjoint.requires_intersection());
        // disjoint as a pattern
        assert!(!"FF*FF****".parse::<Relation>().unwrap().requires_intersection());
        // touches variant with boundary/boundary contact
        assert!("F***T****".parse::<Relation>().unwrap().requires_intersection());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Relation::Crosses).unwrap();
        assert_eq!(json, "\"crosses\"");
        let back: Relation = serde_json::from_str("\"T*****FF*\"").unwrap();
        assert_eq!(back, Relation::Pattern("T*****FF*".to_string()));
        assert!(serde_json::from_str::<Relation>("\"bogus\"").is_err());
    }
}
