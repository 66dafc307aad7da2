use crate::core::Bounds;
use crate::error::{ChartError, ChartResult};
use crate::render::{LinePrimitive, RectPrimitive, TextPrimitive};

/// Draw commands for one chart pass, in paint order: grid lines, bars, labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub bounds: Bounds,
    pub lines: Vec<LinePrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            lines: Vec::new(),
            rects: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: LinePrimitive) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn with_rect(mut self, rect: RectPrimitive) -> Self {
        self.rects.push(rect);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: TextPrimitive) -> Self {
        self.texts.push(text);
        self
    }

    /// Checks the bounds and every primitive; the error names the first
    /// offending primitive by kind and index.
    pub fn validate(&self) -> ChartResult<()> {
        self.bounds.validate()?;
        let tag = |kind: &str, index: usize, err: ChartError| match err {
            ChartError::InvalidData(reason) => {
                ChartError::InvalidData(format!("{kind} #{index}: {reason}"))
            }
            other => other,
        };

        for (index, line) in self.lines.iter().enumerate() {
            line.validate().map_err(|err| tag("line", index, err))?;
        }
        for (index, rect) in self.rects.iter().enumerate() {
            rect.validate().map_err(|err| tag("rect", index, err))?;
        }
        for (index, text) in self.texts.iter().enumerate() {
            text.validate().map_err(|err| tag("text", index, err))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.lines.len() + self.rects.len() + self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }
}
