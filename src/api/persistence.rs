use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{AnchorPosition, ChartScales, ToolId};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{DrawingState, validate_candidate};
use crate::style::ToolStyle;
use crate::tools::{DrawingTool, ToolKind};

use super::DrawingEngine;
use super::tool_factory::{AnchorSpec, resolve_anchor};

/// Snapshot schema version written by [`DrawingEngine::snapshot`].
pub const DRAWING_SNAPSHOT_VERSION: u32 = 1;

/// Stored anchor: `time` for time-keyed charts, `bars_ago` (offset from the
/// newest bar) for bar-indexed ones. Never pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedAnchor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars_ago: Option<i64>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSnapshot {
    pub tag: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub kind: ToolKind,
    pub anchors: Vec<PersistedAnchor>,
    pub style: ToolStyle,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub template_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingSnapshot {
    pub version: u32,
    pub tools: Vec<ToolSnapshot>,
}

impl<S: ChartScales> DrawingEngine<S> {
    /// Serializable state of every placed tool, bottom first. Tools still
    /// being built are left out.
    pub fn snapshot(&self) -> DrawingResult<DrawingSnapshot> {
        let last_index = self.bars.len().checked_sub(1);
        let mut tools = Vec::with_capacity(self.tools.len());
        for tool in self.tools.values() {
            if tool.state() == DrawingState::Building {
                continue;
            }
            let anchors = tool
                .anchors()
                .iter()
                .map(|anchor| match anchor.position {
                    AnchorPosition::Time(time) => Ok(PersistedAnchor {
                        time: Some(time),
                        bars_ago: None,
                        price: anchor.price,
                    }),
                    AnchorPosition::BarIndex(index) => {
                        let last = last_index.ok_or_else(|| {
                            DrawingError::Persistence(
                                "bar-indexed anchors need loaded bars to persist".to_owned(),
                            )
                        })?;
                        Ok(PersistedAnchor {
                            time: None,
                            bars_ago: Some(last as i64 - index),
                            price: anchor.price,
                        })
                    }
                })
                .collect::<DrawingResult<Vec<_>>>()?;
            tools.push(ToolSnapshot {
                tag: tool.tag().to_owned(),
                owner: tool.owner().map(str::to_owned),
                kind: tool.kind().clone(),
                anchors,
                style: tool.style,
                locked: tool.locked,
                is_global: tool.is_global,
                template_name: tool.template_name().map(str::to_owned),
            });
        }
        Ok(DrawingSnapshot {
            version: DRAWING_SNAPSHOT_VERSION,
            tools,
        })
    }

    /// Serializes snapshot as pretty JSON.
    pub fn snapshot_json_pretty(&self) -> DrawingResult<String> {
        let snapshot = self.snapshot()?;
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| DrawingError::Persistence(format!("failed to serialize snapshot: {e}")))
    }

    /// Restores tools from a snapshot on top of the current ones.
    ///
    /// A tool that no longer resolves against the current bars, or whose
    /// anchors fall outside the drawable bar range, is skipped with a
    /// warning; the rest are restored. Returns the restored ids.
    pub fn restore_snapshot(&mut self, snapshot: DrawingSnapshot) -> DrawingResult<Vec<ToolId>> {
        if snapshot.version != DRAWING_SNAPSHOT_VERSION {
            return Err(DrawingError::Persistence(format!(
                "unsupported drawing snapshot version {}",
                snapshot.version
            )));
        }
        let mut restored = Vec::with_capacity(snapshot.tools.len());
        for (position, stored) in snapshot.tools.into_iter().enumerate() {
            let tag = stored.tag.clone();
            match self.restore_tool(stored) {
                Ok(id) => restored.push(id),
                Err(err) => warn!(position, tag = %tag, error = %err, "skipping tool that failed to restore"),
            }
        }
        debug!(count = restored.len(), "restored drawing snapshot");
        Ok(restored)
    }

    pub fn restore_from_json(&mut self, json: &str) -> DrawingResult<Vec<ToolId>> {
        let snapshot: DrawingSnapshot = serde_json::from_str(json)
            .map_err(|e| DrawingError::Persistence(format!("failed to parse snapshot: {e}")))?;
        self.restore_snapshot(snapshot)
    }

    fn restore_tool(&mut self, stored: ToolSnapshot) -> DrawingResult<ToolId> {
        stored.kind.validate()?;
        stored.style.validate()?;
        let anchors = stored
            .anchors
            .iter()
            .enumerate()
            .map(|(index, persisted)| {
                let spec = AnchorSpec {
                    bars_ago: persisted.bars_ago,
                    time: persisted.time,
                    price: persisted.price,
                };
                resolve_anchor(index, spec, &self.scales, &self.bars)
            })
            .collect::<DrawingResult<Vec<_>>>()?;

        let id = self.allocate_id();
        let mut tool = DrawingTool::placed(id, stored.kind, stored.style, anchors, &self.scales)?
            .with_tag(stored.tag)
            .with_template_name(stored.template_name);
        if let Some(owner) = stored.owner {
            tool = tool.with_owner(owner);
        }
        tool.locked = stored.locked;
        tool.is_global = stored.is_global;
        if !validate_candidate(tool.anchors(), &self.bars, &self.config.interaction) {
            return Err(DrawingError::argument(
                "anchors",
                "anchors must lie within the available bar range",
            ));
        }
        Ok(self.insert_tool(tool))
    }
}
