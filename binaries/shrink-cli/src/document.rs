//! The text document being reduced.
//!
//! A document is a list of lines grouped into blocks: maximal runs of
//! non-blank lines. Reduction deletes whole blocks first, then single lines
//! of the blocks that survived.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use shrink_core::MinimizationError;
use shrink_snapshot::{BoxError, Checkpointable, ItemLens};

/// A deletable piece of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TextUnit {
    /// Index of a block.
    Block(usize),
    /// Index of a line in the original text.
    Line(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    start: usize,
    end: usize,
}

/// The document plus the set of lines still alive.
///
/// Lines and blocks are shared between copies; only the liveness mask is
/// per copy, which keeps clones and checkpoints cheap.
#[derive(Debug, Clone)]
pub struct TextDocument {
    lines: Arc<[String]>,
    blocks: Arc<[Block]>,
    alive: Vec<bool>,
    trailing_newline: bool,
}

impl TextDocument {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();

        let mut blocks = Vec::new();
        let mut start = None;
        for (index, line) in lines.iter().enumerate() {
            match (line.trim().is_empty(), start) {
                (false, None) => start = Some(index),
                (true, Some(first)) => {
                    blocks.push(Block { start: first, end: index });
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(first) = start {
            blocks.push(Block {
                start: first,
                end: lines.len(),
            });
        }

        Self {
            alive: lines.iter().map(|line| !line.trim().is_empty()).collect(),
            lines: lines.into(),
            blocks: blocks.into(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Read and parse a UTF-8 file.
    pub async fn load(path: &Path) -> Result<Self, MinimizationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MinimizationError::CloningFailed(format!("{}: {}", path.display(), e)))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            MinimizationError::AnalysisFailed(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        Ok(Self::parse(&text))
    }

    /// Alive lines, one blank line between blocks.
    pub fn render(&self) -> String {
        let rendered: Vec<String> = self
            .blocks
            .iter()
            .filter_map(|block| {
                let lines: Vec<&str> = (block.start..block.end)
                    .filter(|&line| self.alive[line])
                    .map(|line| self.lines[line].as_str())
                    .collect();
                (!lines.is_empty()).then(|| lines.join("\n"))
            })
            .collect();

        let mut text = rendered.join("\n\n");
        if self.trailing_newline && !text.is_empty() {
            text.push('\n');
        }
        text
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn alive_lines(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// The first level: every block that still has a line.
    pub fn block_units(&self) -> Vec<TextUnit> {
        (0..self.blocks.len())
            .filter(|&block| self.block_alive(block))
            .map(TextUnit::Block)
            .collect()
    }

    /// Child function for the tree generator: a block yields its alive lines.
    pub fn children(&self) -> impl FnMut(&TextUnit) -> Vec<TextUnit> + Send + 'static {
        let blocks = Arc::clone(&self.blocks);
        move |unit| match unit {
            TextUnit::Block(index) => blocks
                .get(*index)
                .map(|block| (block.start..block.end).map(TextUnit::Line).collect())
                .unwrap_or_default(),
            TextUnit::Line(_) => Vec::new(),
        }
    }

    /// Delete a unit. Deleting something already gone is a no-op.
    pub fn delete(&mut self, unit: TextUnit) -> Result<(), BoxError> {
        match unit {
            TextUnit::Block(index) => {
                let block = self
                    .blocks
                    .get(index)
                    .copied()
                    .ok_or_else(|| format!("no block {}", index))?;
                self.alive[block.start..block.end].fill(false);
            }
            TextUnit::Line(index) => {
                let alive = self
                    .alive
                    .get_mut(index)
                    .ok_or_else(|| format!("no line {}", index))?;
                *alive = false;
            }
        }
        Ok(())
    }

    fn block_alive(&self, index: usize) -> bool {
        let block = self.blocks[index];
        self.alive[block.start..block.end].iter().any(|alive| *alive)
    }
}

impl Checkpointable for TextDocument {
    type Checkpoint = Vec<bool>;

    fn checkpoint(&self) -> Result<Vec<bool>, BoxError> {
        Ok(self.alive.clone())
    }

    fn restore(&mut self, checkpoint: Vec<bool>) {
        self.alive = checkpoint;
    }
}

/// Applies deletions of [`TextUnit`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLens;

#[async_trait]
impl ItemLens<TextDocument, TextUnit> for TextLens {
    async fn focus_on(&self, items: &[TextUnit], context: &mut TextDocument) -> Result<(), BoxError> {
        for item in items {
            context.delete(*item)?;
        }
        Ok(())
    }
}
