//! Per-stream content block bookkeeping.
//!
//! Every structural block of a streamed response (text, reasoning, tool call)
//! moves through `NotStarted -> Open -> Closed` exactly once. The table turns
//! lifecycle transitions into canonical stream parts and swallows anything
//! that would break the `start, delta*, end` ordering.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::protocol::canonical::StreamPart;
use crate::protocol::mapping::{is_complete_json, parse_tool_input};

/// Vendor-scoped identity of a block within one stream.
///
/// Anthropic addresses blocks by content index. `OpenAI` uses one text and one
/// reasoning block per stream plus one block per tool-call index, so those
/// namespaces are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKey {
    Index(usize),
    ToolCall(usize),
    Text,
    Reasoning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Reasoning,
    ToolCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    NotStarted,
    Open,
    Closed,
}

/// What is known about a block at the moment it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub key: BlockKey,
    pub kind: BlockKind,
    /// Part id carried on every emitted part of the block.
    pub id: String,
    pub tool_name: Option<String>,
    /// Close the block as soon as its accumulated input parses as JSON.
    pub close_on_valid_json: bool,
}

impl BlockSpec {
    #[must_use]
    pub fn text(key: BlockKey, id: impl Into<String>) -> Self {
        Self {
            key,
            kind: BlockKind::Text,
            id: id.into(),
            tool_name: None,
            close_on_valid_json: false,
        }
    }

    #[must_use]
    pub fn reasoning(key: BlockKey, id: impl Into<String>) -> Self {
        Self {
            key,
            kind: BlockKind::Reasoning,
            id: id.into(),
            tool_name: None,
            close_on_valid_json: false,
        }
    }

    #[must_use]
    pub fn tool_call(key: BlockKey, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key,
            kind: BlockKind::ToolCall,
            id: id.into(),
            tool_name: Some(name.into()),
            close_on_valid_json: false,
        }
    }

    #[must_use]
    pub fn closing_on_valid_json(mut self) -> Self {
        self.close_on_valid_json = true;
        self
    }
}

/// Live state of one block.
#[derive(Debug, Clone)]
pub struct ContentBlockState {
    pub key: BlockKey,
    /// Unknown until the block opens.
    pub kind: Option<BlockKind>,
    pub part_id: String,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
    /// Delta text received so far. Before the block opens this is the
    /// buffer flushed on open.
    pub accumulated: String,
    pub lifecycle: Lifecycle,
    pub close_on_valid_json: bool,
}

impl ContentBlockState {
    fn new(key: BlockKey) -> Self {
        Self {
            key,
            kind: None,
            part_id: String::new(),
            tool_name: None,
            tool_call_id: None,
            accumulated: String::new(),
            lifecycle: Lifecycle::NotStarted,
            close_on_valid_json: false,
        }
    }

    fn start_part(&self) -> Option<StreamPart> {
        let id = self.part_id.clone();
        Some(match self.kind? {
            BlockKind::Text => StreamPart::TextStart { id },
            BlockKind::Reasoning => StreamPart::ReasoningStart { id },
            BlockKind::ToolCall => StreamPart::ToolInputStart {
                id,
                name: self.tool_name.clone().unwrap_or_default(),
            },
        })
    }

    fn delta_part(&self, delta: String) -> Option<StreamPart> {
        let id = self.part_id.clone();
        Some(match self.kind? {
            BlockKind::Text => StreamPart::TextDelta { id, delta },
            BlockKind::Reasoning => StreamPart::ReasoningDelta { id, delta },
            BlockKind::ToolCall => StreamPart::ToolInputDelta { id, delta },
        })
    }

    fn close_into(&mut self, out: &mut Vec<StreamPart>) {
        self.lifecycle = Lifecycle::Closed;
        let accumulated = std::mem::take(&mut self.accumulated);
        let id = self.part_id.clone();
        match self.kind {
            Some(BlockKind::Text) => out.push(StreamPart::TextEnd { id }),
            Some(BlockKind::Reasoning) => out.push(StreamPart::ReasoningEnd { id }),
            Some(BlockKind::ToolCall) => {
                out.push(StreamPart::ToolInputEnd { id });
                out.push(StreamPart::ToolCall {
                    id: self.tool_call_id.clone().unwrap_or_else(|| self.part_id.clone()),
                    name: self.tool_name.clone().unwrap_or_default(),
                    input: parse_tool_input(&accumulated),
                });
            }
            None => {}
        }
    }

    fn close_if_complete(&mut self, out: &mut Vec<StreamPart>) {
        if self.close_on_valid_json && is_complete_json(&self.accumulated) {
            self.close_into(out);
        }
    }
}

// ---------------------------------------------------------------------------
// BlockTable
// ---------------------------------------------------------------------------

/// All blocks of one stream, in first-seen order.
#[derive(Debug, Default)]
pub struct BlockTable {
    blocks: Vec<ContentBlockState>,
    by_key: FxHashMap<BlockKey, usize>,
    open_order: Vec<usize>,
}

impl BlockTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, key: BlockKey) -> usize {
        if let Some(&slot) = self.by_key.get(&key) {
            return slot;
        }
        let slot = self.blocks.len();
        self.blocks.push(ContentBlockState::new(key.clone()));
        self.by_key.insert(key, slot);
        slot
    }

    /// Open the block described by `spec`.
    ///
    /// Emits the start part, then any text buffered while the block was not
    /// started as a single delta. Re-opening an open block is a no-op;
    /// re-opening a closed block is ignored.
    pub fn open(&mut self, spec: BlockSpec, out: &mut Vec<StreamPart>) {
        let slot = self.slot(spec.key.clone());
        let state = &mut self.blocks[slot];
        match state.lifecycle {
            Lifecycle::Open => return,
            Lifecycle::Closed => {
                debug!(key = ?spec.key, "ignoring open of closed block");
                return;
            }
            Lifecycle::NotStarted => {}
        }

        state.tool_call_id = (spec.kind == BlockKind::ToolCall).then(|| spec.id.clone());
        state.kind = Some(spec.kind);
        state.part_id = spec.id;
        state.tool_name = spec.tool_name;
        state.close_on_valid_json = spec.close_on_valid_json;
        state.lifecycle = Lifecycle::Open;
        self.open_order.push(slot);

        out.extend(state.start_part());
        if !state.accumulated.is_empty() {
            out.extend(state.delta_part(state.accumulated.clone()));
            state.close_if_complete(out);
        }
    }

    /// Append delta text to the block under `key`.
    ///
    /// Open blocks emit the delta. Blocks not yet started buffer it. Closed
    /// blocks drop it. Empty deltas are dropped.
    pub fn append(&mut self, key: BlockKey, delta: String, out: &mut Vec<StreamPart>) {
        if delta.is_empty() {
            return;
        }
        let slot = self.slot(key);
        let state = &mut self.blocks[slot];
        match state.lifecycle {
            Lifecycle::NotStarted => state.accumulated.push_str(&delta),
            Lifecycle::Open => {
                state.accumulated.push_str(&delta);
                out.extend(state.delta_part(delta));
                state.close_if_complete(out);
            }
            Lifecycle::Closed => {
                debug!(key = ?state.key, len = delta.len(), "dropping delta for closed block");
            }
        }
    }

    /// Close the block under `key` if it is open.
    pub fn close(&mut self, key: &BlockKey, out: &mut Vec<StreamPart>) {
        let Some(&slot) = self.by_key.get(key) else {
            return;
        };
        let state = &mut self.blocks[slot];
        if state.lifecycle == Lifecycle::Open {
            state.close_into(out);
        }
    }

    /// Close every open block in the order the blocks were opened.
    pub fn close_all(&mut self, out: &mut Vec<StreamPart>) {
        for &slot in &self.open_order {
            let state = &mut self.blocks[slot];
            if state.lifecycle == Lifecycle::Open {
                state.close_into(out);
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &BlockKey) -> Option<&ContentBlockState> {
        self.by_key.get(key).map(|&slot| &self.blocks[slot])
    }

    #[must_use]
    pub fn lifecycle(&self, key: &BlockKey) -> Lifecycle {
        self.get(key).map_or(Lifecycle::NotStarted, |state| state.lifecycle)
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|state| state.lifecycle == Lifecycle::Open)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_block_lifecycle() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.open(BlockSpec::text(BlockKey::Index(0), "0"), &mut out);
        table.append(BlockKey::Index(0), "Hel".into(), &mut out);
        table.append(BlockKey::Index(0), "lo".into(), &mut out);
        table.close(&BlockKey::Index(0), &mut out);

        assert_eq!(
            out,
            vec![
                StreamPart::TextStart { id: "0".into() },
                StreamPart::TextDelta {
                    id: "0".into(),
                    delta: "Hel".into()
                },
                StreamPart::TextDelta {
                    id: "0".into(),
                    delta: "lo".into()
                },
                StreamPart::TextEnd { id: "0".into() },
            ]
        );
        assert_eq!(table.lifecycle(&BlockKey::Index(0)), Lifecycle::Closed);
    }

    #[test]
    fn test_reopen_is_noop_and_closed_is_terminal() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        let spec = BlockSpec::reasoning(BlockKey::Reasoning, "reasoning-0");
        table.open(spec.clone(), &mut out);
        table.open(spec.clone(), &mut out);
        assert_eq!(out.len(), 1);

        table.close(&BlockKey::Reasoning, &mut out);
        table.close(&BlockKey::Reasoning, &mut out);
        table.open(spec, &mut out);
        table.append(BlockKey::Reasoning, "late".into(), &mut out);
        assert_eq!(
            out,
            vec![
                StreamPart::ReasoningStart {
                    id: "reasoning-0".into()
                },
                StreamPart::ReasoningEnd {
                    id: "reasoning-0".into()
                },
            ]
        );
    }

    #[test]
    fn test_close_of_unstarted_block_emits_nothing() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.close(&BlockKey::Index(3), &mut out);
        table.append(BlockKey::Index(4), "orphan".into(), &mut out);
        table.close(&BlockKey::Index(4), &mut out);
        assert!(out.is_empty());
        assert_eq!(table.lifecycle(&BlockKey::Index(4)), Lifecycle::NotStarted);
    }

    #[test]
    fn test_buffered_deltas_flush_on_open() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.append(BlockKey::ToolCall(0), "{\"a\":".into(), &mut out);
        table.append(BlockKey::ToolCall(0), "1".into(), &mut out);
        assert!(out.is_empty());

        table.open(
            BlockSpec::tool_call(BlockKey::ToolCall(0), "call_1", "f"),
            &mut out,
        );
        assert_eq!(
            out,
            vec![
                StreamPart::ToolInputStart {
                    id: "call_1".into(),
                    name: "f".into()
                },
                StreamPart::ToolInputDelta {
                    id: "call_1".into(),
                    delta: "{\"a\":1".into()
                },
            ]
        );
    }

    #[test]
    fn test_tool_close_emits_end_and_call() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.open(
            BlockSpec::tool_call(BlockKey::Index(1), "toolu_1", "get_weather"),
            &mut out,
        );
        table.append(BlockKey::Index(1), "{\"city\":\"NYC\"}".into(), &mut out);
        out.clear();
        table.close(&BlockKey::Index(1), &mut out);
        assert_eq!(
            out,
            vec![
                StreamPart::ToolInputEnd {
                    id: "toolu_1".into()
                },
                StreamPart::ToolCall {
                    id: "toolu_1".into(),
                    name: "get_weather".into(),
                    input: json!({"city": "NYC"}),
                },
            ]
        );
    }

    #[test]
    fn test_close_on_valid_json() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        let key = BlockKey::ToolCall(0);
        table.open(
            BlockSpec::tool_call(key.clone(), "call_0", "f").closing_on_valid_json(),
            &mut out,
        );
        table.append(key.clone(), "{\"x\":".into(), &mut out);
        assert_eq!(table.lifecycle(&key), Lifecycle::Open);
        table.append(key.clone(), "2}".into(), &mut out);
        assert_eq!(table.lifecycle(&key), Lifecycle::Closed);
        table.append(key.clone(), "}".into(), &mut out);

        let calls: Vec<_> = out
            .iter()
            .filter(|part| matches!(part, StreamPart::ToolCall { .. }))
            .collect();
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn test_malformed_tool_input_falls_back_to_empty_object() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.open(BlockSpec::tool_call(BlockKey::Index(0), "t", "f"), &mut out);
        table.append(BlockKey::Index(0), "{\"broken".into(), &mut out);
        out.clear();
        table.close_all(&mut out);
        assert!(matches!(
            out.last(),
            Some(StreamPart::ToolCall { input, .. }) if *input == json!({})
        ));
    }

    #[test]
    fn test_close_all_uses_opening_order() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        // Index 1 is referenced first but opened second.
        table.append(BlockKey::Index(1), "b".into(), &mut out);
        table.open(BlockSpec::text(BlockKey::Index(0), "0"), &mut out);
        table.open(BlockSpec::text(BlockKey::Index(1), "1"), &mut out);
        out.clear();
        table.close_all(&mut out);
        assert_eq!(
            out,
            vec![
                StreamPart::TextEnd { id: "0".into() },
                StreamPart::TextEnd { id: "1".into() },
            ]
        );
        assert_eq!(table.open_count(), 0);
    }

    #[test]
    fn test_empty_delta_is_dropped() {
        let mut table = BlockTable::new();
        let mut out = Vec::new();
        table.open(BlockSpec::text(BlockKey::Text, "0"), &mut out);
        table.append(BlockKey::Text, String::new(), &mut out);
        assert_eq!(out.len(), 1);
    }
}
