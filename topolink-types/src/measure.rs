use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which per-axis bounding-box statistic drives the grid cell size.
///
/// `Average` performed best in the published evaluation of the grid join and
/// is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatMeasure {
    Min,
    Max,
    #[default]
    #[serde(alias = "avg")]
    Average,
    #[serde(alias = "med")]
    Median,
}

impl FromStr for StatMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(StatMeasure::Min),
            "max" => Ok(StatMeasure::Max),
            "avg" | "average" => Ok(StatMeasure::Average),
            "med" | "median" => Ok(StatMeasure::Median),
            other => Err(format!("unknown statistic measure: {}", other)),
        }
    }
}

impl fmt::Display for StatMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatMeasure::Min => "min",
            StatMeasure::Max => "max",
            StatMeasure::Average => "average",
            StatMeasure::Median => "median",
        };
        f.write_str(name)
    }
}
