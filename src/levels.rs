//! Percentage sub-levels attached to a base line (Fibonacci families).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::ChartScales;
use crate::error::{DrawingError, DrawingResult};
use crate::geometry::align_half_pixel;
use crate::style::{Color, Stroke};

/// Schema version written by [`persist_level`].
pub const CURRENT_LEVEL_SCHEMA_VERSION: u64 = 2;

/// How a level's label is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LevelName {
    /// Formatted from the level value, e.g. `61.8%`.
    #[default]
    Percent,
    Custom(String),
}

/// One percentage level. `value` is deliberately unclamped: values above 100
/// or below 0 describe extensions beyond the base range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub value: f64,
    pub stroke: Stroke,
    pub is_visible: bool,
    pub name: LevelName,
}

impl PriceLevel {
    #[must_use]
    pub fn new(value: f64, stroke: Stroke) -> Self {
        Self {
            value,
            stroke,
            is_visible: true,
            name: LevelName::Percent,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = LevelName::Custom(name.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            LevelName::Percent => format!("{}%", format_percent(self.value)),
            LevelName::Custom(name) => name.clone(),
        }
    }

    /// Price of this level over `[start_price, start_price + total_range]`.
    ///
    /// With `invert`, 0% sits at the far end of the range instead of at
    /// `start_price`.
    #[must_use]
    pub fn get_price(&self, start_price: f64, total_range: f64, invert: bool) -> f64 {
        let ratio = self.value / 100.0;
        if invert {
            start_price + (1.0 - ratio) * total_range
        } else {
            start_price + ratio * total_range
        }
    }

    /// Pixel Y of [`PriceLevel::get_price`], aligned to a pixel center.
    pub fn get_y(
        &self,
        scales: &dyn ChartScales,
        start_price: f64,
        total_range: f64,
        invert: bool,
    ) -> DrawingResult<f64> {
        let y = scales.price_to_y(self.get_price(start_price, total_range, invert))?;
        Ok(align_half_pixel(y))
    }
}

fn format_percent(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Default retracement levels.
#[must_use]
pub fn fibonacci_retracement_levels(stroke: Stroke) -> Vec<PriceLevel> {
    [0.0, 23.6, 38.2, 50.0, 61.8, 76.4, 100.0]
        .into_iter()
        .map(|value| PriceLevel::new(value, stroke))
        .collect()
}

/// Default extension levels.
#[must_use]
pub fn fibonacci_extension_levels(stroke: Stroke) -> Vec<PriceLevel> {
    [0.0, 38.2, 61.8, 100.0, 138.2, 161.8, 200.0, 261.8]
        .into_iter()
        .map(|value| PriceLevel::new(value, stroke))
        .collect()
}

/// Legacy level record: flat color/width, no dash, percent label only.
#[derive(Debug, Deserialize)]
struct LevelRecordV1 {
    value: f64,
    color: String,
    #[serde(default = "default_width")]
    width: f64,
    #[serde(default = "default_true")]
    visible: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct LevelRecordV2 {
    version: u64,
    value: f64,
    stroke: Stroke,
    is_visible: bool,
    #[serde(default)]
    name: LevelName,
}

fn default_width() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Serializes a level in the current schema.
pub fn persist_level(level: &PriceLevel) -> DrawingResult<Value> {
    let record = LevelRecordV2 {
        version: CURRENT_LEVEL_SCHEMA_VERSION,
        value: level.value,
        stroke: level.stroke,
        is_visible: level.is_visible,
        name: level.name.clone(),
    };
    Ok(serde_json::to_value(record)?)
}

/// Reads one persisted level of any known schema version into a current
/// [`PriceLevel`]. Records without a `version` field are treated as v1.
pub fn migrate_level(record: &Value) -> DrawingResult<PriceLevel> {
    let version = match record.get("version") {
        None => 1,
        Some(version) => version.as_u64().ok_or_else(|| {
            DrawingError::Persistence("level `version` must be an unsigned integer".to_owned())
        })?,
    };

    let level = match version {
        1 => {
            let legacy = LevelRecordV1::deserialize(record)?;
            let color = Color::from_hex(&legacy.color)
                .map_err(|err| DrawingError::Persistence(err.to_string()))?;
            PriceLevel {
                value: legacy.value,
                stroke: Stroke::new(color, legacy.width),
                is_visible: legacy.visible,
                name: LevelName::Percent,
            }
        }
        2 => {
            let current = LevelRecordV2::deserialize(record)?;
            PriceLevel {
                value: current.value,
                stroke: current.stroke,
                is_visible: current.is_visible,
                name: current.name,
            }
        }
        other => {
            return Err(DrawingError::Persistence(format!(
                "unsupported level schema version {other}"
            )));
        }
    };

    if !level.value.is_finite() {
        return Err(DrawingError::Persistence(
            "level value must be finite".to_owned(),
        ));
    }
    level
        .stroke
        .validate()
        .map_err(|err| DrawingError::Persistence(err.to_string()))?;
    Ok(level)
}

/// A persisted level that could not be migrated.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLevel {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelMigrationReport {
    pub levels: Vec<PriceLevel>,
    pub skipped: Vec<SkippedLevel>,
}

/// Migrates every item independently; failing items are skipped and reported.
#[must_use]
pub fn migrate_levels(records: &[Value]) -> LevelMigrationReport {
    let mut report = LevelMigrationReport::default();
    for (index, record) in records.iter().enumerate() {
        match migrate_level(record) {
            Ok(level) => report.levels.push(level),
            Err(err) => {
                warn!(index, error = %err, "skipping price level that failed migration");
                report.skipped.push(SkippedLevel {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }
    debug!(
        migrated = report.levels.len(),
        skipped = report.skipped.len(),
        "migrated price levels"
    );
    report
}

pub fn levels_to_json(levels: &[PriceLevel]) -> DrawingResult<Value> {
    let items = levels
        .iter()
        .map(persist_level)
        .collect::<DrawingResult<Vec<_>>>()?;
    Ok(Value::Array(items))
}

/// Parses a JSON array of persisted levels. Only a malformed outer document is
/// an error; individual bad items end up in [`LevelMigrationReport::skipped`].
pub fn levels_from_json(json: &str) -> DrawingResult<LevelMigrationReport> {
    let document: Value = serde_json::from_str(json)?;
    let items = document.as_array().ok_or_else(|| {
        DrawingError::Persistence("price levels must be persisted as a JSON array".to_owned())
    })?;
    Ok(migrate_levels(items))
}

/// `#[serde(with = "...")]` adapter storing level lists in the versioned schema.
///
/// Deserialization migrates item by item and drops items that fail.
pub mod versioned {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    use super::{PriceLevel, levels_to_json, migrate_levels};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(levels: &Vec<PriceLevel>, serializer: S) -> Result<S::Ok, S::Error> {
        levels_to_json(levels)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PriceLevel>, D::Error> {
        let items = Vec::<Value>::deserialize(deserializer)?;
        Ok(migrate_levels(&items).levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_names_trim_trailing_zeros() {
        let stroke = Stroke::default();
        assert_eq!(PriceLevel::new(61.8, stroke).display_name(), "61.8%");
        assert_eq!(PriceLevel::new(100.0, stroke).display_name(), "100%");
        assert_eq!(PriceLevel::new(-0.0, stroke).display_name(), "0%");
        assert_eq!(
            PriceLevel::new(50.0, stroke).with_name("Half").display_name(),
            "Half"
        );
    }

    #[test]
    fn legacy_record_without_version_migrates() {
        let record = serde_json::json!({ "value": 38.2, "color": "#ff0000", "width": 2.0 });
        let level = migrate_level(&record).expect("legacy level");
        assert_eq!(level.value, 38.2);
        assert_eq!(level.stroke.width, 2.0);
        assert_eq!(level.stroke.color, Color::rgb(1.0, 0.0, 0.0));
        assert!(level.is_visible);
    }
}
