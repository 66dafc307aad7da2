//! Text measurement seam.
//!
//! Layout needs label extents before anything is drawn, so it depends on a
//! small measuring trait instead of a font stack. Implementations must be
//! deterministic: the same text and style always yield the same metrics.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f64,
}

impl TextStyle {
    #[must_use]
    pub const fn new(font_size: f64) -> Self {
        Self { font_size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

pub trait TextMeasurer {
    /// Measures `text` as a single line.
    fn measure(&self, text: &str, style: TextStyle) -> TextMetrics;
}

impl<M: TextMeasurer + ?Sized> TextMeasurer for Rc<M> {
    fn measure(&self, text: &str, style: TextStyle) -> TextMetrics {
        (**self).measure(text, style)
    }
}

impl<M: TextMeasurer + ?Sized> TextMeasurer for &M {
    fn measure(&self, text: &str, style: TextStyle) -> TextMetrics {
        (**self).measure(text, style)
    }
}

/// Fixed-advance estimate: 0.6em per character, 1em line height.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, style: TextStyle) -> TextMetrics {
        TextMetrics {
            width: 0.6 * style.font_size * text.chars().count() as f64,
            height: style.font_size,
        }
    }
}

/// Runtime metrics exposed by [`CachedTextMeasurer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMeasureCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

type MeasureKey = (String, OrderedFloat<f64>);

/// Memoizing wrapper around a slower measurer.
#[derive(Debug)]
pub struct CachedTextMeasurer<M> {
    inner: M,
    entries: RefCell<HashMap<MeasureKey, TextMetrics>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<M: TextMeasurer> CachedTextMeasurer<M> {
    const MAX_ENTRIES: usize = 4096;

    #[must_use]
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            entries: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> TextMeasureCacheStats {
        TextMeasureCacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            size: self.entries.borrow().len(),
        }
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<M: TextMeasurer> TextMeasurer for CachedTextMeasurer<M> {
    fn measure(&self, text: &str, style: TextStyle) -> TextMetrics {
        let key = (text.to_owned(), OrderedFloat(style.font_size));
        if let Some(metrics) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get().saturating_add(1));
            return *metrics;
        }

        let metrics = self.inner.measure(text, style);
        self.misses.set(self.misses.get().saturating_add(1));
        let mut entries = self.entries.borrow_mut();
        if entries.len() >= Self::MAX_ENTRIES {
            entries.clear();
        }
        entries.insert(key, metrics);
        metrics
    }
}

/// Widest measured width among `texts`, or 0 when there are none.
pub fn widest_text<'a>(
    measurer: &dyn TextMeasurer,
    texts: impl IntoIterator<Item = &'a str>,
    style: TextStyle,
) -> f64 {
    texts
        .into_iter()
        .map(|text| measurer.measure(text, style).width)
        .fold(0.0, f64::max)
}
