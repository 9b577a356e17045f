//! Label recognition as an ordered chain of strategies.
//!
//! Each strategy is a pure function of a cropped component. The chain asks
//! strategies in order and stops at the first whose best guess is confident
//! enough; if none is, the most confident answer seen is kept.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::geometry::{LabelGuess, LabelShape};
use crate::operations::ensure_non_negative;
use crate::raster::{Component, Labeling, PixelGrid};

/// A character classifier for one cropped label.
pub trait LabelRecognizer {
    /// Ranked guesses for the glyph in `crop`; empty when nothing matches.
    fn recognize(&self, crop: &PixelGrid) -> Vec<LabelGuess>;
}

/// Parameters for [`RecognizerChain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionParams {
    /// A strategy's answer is final once its best guess reaches this.
    pub min_confidence: f32,
    /// Components outside this height range (px) are not characters.
    pub min_char_height: i32,
    pub max_char_height: i32,
    /// Narrowest accepted character (px); thinner components are strokes.
    pub min_char_width: i32,
    /// Widest accepted width-to-height ratio.
    pub max_aspect: f64,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_char_height: 6,
            max_char_height: 40,
            min_char_width: 2,
            max_aspect: 2.0,
        }
    }
}

impl RecognitionParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for negative or non-finite
    /// values.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("recognition.min_confidence", f64::from(self.min_confidence))?;
        ensure_non_negative("recognition.min_char_height", f64::from(self.min_char_height))?;
        ensure_non_negative("recognition.max_char_height", f64::from(self.max_char_height))?;
        ensure_non_negative("recognition.min_char_width", f64::from(self.min_char_width))?;
        ensure_non_negative("recognition.max_aspect", self.max_aspect)
    }
}

/// Ordered list of recognition strategies.
#[derive(Default)]
pub struct RecognizerChain {
    params: RecognitionParams,
    strategies: Vec<Box<dyn LabelRecognizer>>,
}

impl std::fmt::Debug for RecognizerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerChain")
            .field("params", &self.params)
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

impl RecognizerChain {
    #[must_use]
    pub fn new(params: RecognitionParams) -> Self {
        Self {
            params,
            strategies: Vec::new(),
        }
    }

    /// Appends a fallback strategy.
    #[must_use]
    pub fn with(mut self, strategy: impl LabelRecognizer + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Guesses from the first confident strategy, or the most confident
    /// answer when no strategy is confident.
    #[must_use]
    pub fn recognize(&self, crop: &PixelGrid) -> Vec<LabelGuess> {
        let mut fallback: Vec<LabelGuess> = Vec::new();
        for strategy in &self.strategies {
            let mut guesses = strategy.recognize(crop);
            guesses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            let best = guesses.first().map_or(f32::NEG_INFINITY, |g| g.confidence);
            if best >= self.params.min_confidence {
                return guesses;
            }
            let kept = fallback.first().map_or(f32::NEG_INFINITY, |g| g.confidence);
            if best > kept {
                fallback = guesses;
            }
        }
        fallback
    }

    /// `true` if the component is shaped like a character.
    #[must_use]
    pub fn is_candidate(&self, c: &Component) -> bool {
        let p = &self.params;
        (p.min_char_height..=p.max_char_height).contains(&c.height())
            && c.width() >= p.min_char_width
            && f64::from(c.width()) <= p.max_aspect * f64::from(c.height())
    }

    /// Recognizes every character-shaped component of `grid`.
    ///
    /// Each crop holds only the component's own pixels, so bond ends
    /// reaching into the box do not disturb the match. Only components
    /// whose best guess reaches `min_confidence` become label shapes.
    ///
    /// # Errors
    ///
    /// Returns an error if a component's bounds fall outside `grid`.
    pub fn label_shapes(&self, grid: &PixelGrid, labeling: &Labeling) -> Result<Vec<LabelShape>> {
        let mut out = Vec::new();
        for c in labeling.components().iter().filter(|c| self.is_candidate(c)) {
            let mut crop = grid.crop(
                c.min_x as usize,
                c.min_y as usize,
                c.width() as usize,
                c.height() as usize,
            )?;
            let foreign: Vec<(i32, i32)> = crop
                .iter_on()
                .filter(|&(x, y)| labeling.label(c.min_x + x, c.min_y + y) != c.id)
                .collect();
            for (x, y) in foreign {
                crop.set(x, y, false);
            }
            let guesses = self.recognize(&crop);
            let confident = guesses
                .first()
                .is_some_and(|g| g.confidence >= self.params.min_confidence);
            if confident {
                out.push(LabelShape::new(c.bounding_box(), guesses));
            }
        }
        debug!(labels = out.len(), "recognized atom labels");
        Ok(out)
    }
}

/// Matches crops against bitmap glyphs scaled to the crop size.
///
/// Confidence is the intersection over union of the ink of crop and scaled
/// glyph, weighted by how well their aspect ratios agree. Scaling alone
/// would stretch any glyph over a thin stroke.
#[derive(Debug, Default, Clone)]
pub struct TemplateRecognizer {
    templates: Vec<(String, PixelGrid)>,
}

impl TemplateRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a glyph for `symbol`.
    #[must_use]
    pub fn with_template(mut self, symbol: impl Into<String>, glyph: PixelGrid) -> Self {
        self.templates.push((symbol.into(), glyph));
        self
    }
}

impl LabelRecognizer for TemplateRecognizer {
    fn recognize(&self, crop: &PixelGrid) -> Vec<LabelGuess> {
        let (w, h) = (crop.width(), crop.height());
        if crop.is_empty() {
            return Vec::new();
        }
        let crop_aspect = w as f32 / h as f32;
        self.templates
            .iter()
            .filter(|(_, glyph)| !glyph.is_empty())
            .map(|(symbol, glyph)| {
                let (mut both, mut either) = (0_usize, 0_usize);
                for (x, y) in (0..h).flat_map(|y| (0..w).map(move |x| (x, y))) {
                    let gx = x * glyph.width() / w;
                    let gy = y * glyph.height() / h;
                    let (a, b) = (
                        crop.get(x as i32, y as i32),
                        glyph.get(gx as i32, gy as i32),
                    );
                    both += usize::from(a && b);
                    either += usize::from(a || b);
                }
                let iou = if either == 0 {
                    0.0
                } else {
                    both as f32 / either as f32
                };
                let glyph_aspect = glyph.width() as f32 / glyph.height() as f32;
                let fit = crop_aspect.min(glyph_aspect) / crop_aspect.max(glyph_aspect);
                LabelGuess::new(symbol.clone(), iou * fit)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::ComponentLabeler;

    struct Fixed(&'static str, f32);

    impl LabelRecognizer for Fixed {
        fn recognize(&self, _crop: &PixelGrid) -> Vec<LabelGuess> {
            vec![LabelGuess::new(self.0, self.1)]
        }
    }

    struct Nothing;

    impl LabelRecognizer for Nothing {
        fn recognize(&self, _crop: &PixelGrid) -> Vec<LabelGuess> {
            Vec::new()
        }
    }

    fn glyph_n() -> PixelGrid {
        PixelGrid::from_ascii(&[
            "#...#", "##..#", "#.#.#", "#..##", "#...#", "#...#",
        ])
        .unwrap()
    }

    fn glyph_o() -> PixelGrid {
        PixelGrid::from_ascii(&[
            ".###.", "#...#", "#...#", "#...#", "#...#", ".###.",
        ])
        .unwrap()
    }

    #[test]
    fn first_confident_strategy_wins() {
        let chain = RecognizerChain::default()
            .with(Fixed("O", 0.3))
            .with(Fixed("N", 0.8))
            .with(Fixed("S", 0.99));
        let guesses = chain.recognize(&PixelGrid::new(4, 4));
        assert_eq!(guesses[0].symbol, "N");
    }

    #[test]
    fn falls_back_to_most_confident_answer() {
        let chain = RecognizerChain::default()
            .with(Nothing)
            .with(Fixed("O", 0.3))
            .with(Fixed("S", 0.2));
        assert_eq!(chain.recognize(&PixelGrid::new(4, 4))[0].symbol, "O");
        assert!(RecognizerChain::default().recognize(&PixelGrid::new(4, 4)).is_empty());
    }

    #[test]
    fn templates_tell_glyphs_apart() {
        let rec = TemplateRecognizer::new()
            .with_template("N", glyph_n())
            .with_template("O", glyph_o());
        let mut guesses = rec.recognize(&glyph_o());
        guesses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        assert_eq!(guesses[0].symbol, "O");
        approx::assert_relative_eq!(guesses[0].confidence, 1.0);
    }

    #[test]
    fn label_shapes_cover_character_components() {
        let mut grid = PixelGrid::new(40, 20);
        for (x, y) in glyph_n().iter_on() {
            grid.set(x + 3, y + 4, true);
        }
        for x in 15..38 {
            grid.set(x, 10, true);
        }
        let labeling = ComponentLabeler::default().execute(&grid);
        let chain = RecognizerChain::default()
            .with(TemplateRecognizer::new().with_template("N", glyph_n()));
        let labels = chain.label_shapes(&grid, &labeling).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].symbol(), "N");
        let (min, max) = labels[0].shape.bounds();
        approx::assert_relative_eq!(min.x, 2.5);
        approx::assert_relative_eq!(max.y, 9.5);
    }

    #[test]
    fn thin_strokes_are_not_characters() {
        let mut grid = PixelGrid::new(20, 20);
        for y in 5..12 {
            grid.set(8, y, true);
        }
        let labeling = ComponentLabeler::default().execute(&grid);
        let chain = RecognizerChain::default()
            .with(TemplateRecognizer::new().with_template("O", glyph_o()));
        assert!(!chain.is_candidate(&labeling.components()[0]));
        assert!(chain.label_shapes(&grid, &labeling).unwrap().is_empty());

        let stroke = PixelGrid::from_fn(1, 7, |_, _| true);
        let guesses = TemplateRecognizer::new()
            .with_template("O", glyph_o())
            .recognize(&stroke);
        assert!(guesses[0].confidence < RecognitionParams::default().min_confidence);
    }

    #[test]
    fn stray_ink_inside_the_box_is_ignored() {
        let mut grid = PixelGrid::new(30, 20);
        for (x, y) in glyph_o().iter_on() {
            grid.set(x + 10, y + 5, true);
        }
        // loose end inside the ring, not connected to it
        grid.set(12, 7, true);
        grid.set(12, 8, true);
        let labeling = ComponentLabeler::default().execute(&grid);
        assert_eq!(labeling.components().len(), 2);
        let chain = RecognizerChain::default()
            .with(TemplateRecognizer::new().with_template("O", glyph_o()));
        let labels = chain.label_shapes(&grid, &labeling).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].symbol(), "O");
        approx::assert_relative_eq!(labels[0].guesses[0].confidence, 1.0);
    }
}
