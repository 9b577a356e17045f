use serde::{Deserialize, Serialize};

use super::Shape;

/// One ranked guess from an external character recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGuess {
    /// One- or two-letter atom symbol.
    pub symbol: String,
    pub confidence: f32,
}

impl LabelGuess {
    #[must_use]
    pub fn new(symbol: impl Into<String>, confidence: f32) -> Self {
        Self {
            symbol: symbol.into(),
            confidence,
        }
    }
}

/// A recognized atom label: the region it covers plus its guesses, best
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelShape {
    pub shape: Shape,
    pub guesses: Vec<LabelGuess>,
}

impl LabelShape {
    /// Creates a label shape; guesses are sorted by descending confidence.
    #[must_use]
    pub fn new(shape: Shape, mut guesses: Vec<LabelGuess>) -> Self {
        guesses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self { shape, guesses }
    }

    #[must_use]
    pub fn best(&self) -> Option<&LabelGuess> {
        self.guesses.first()
    }

    /// Symbol of the best guess, defaulting to carbon.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.best().map_or("C", |g| g.symbol.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;

    #[test]
    fn guesses_are_ranked() {
        let label = LabelShape::new(
            Shape::rect(Point2::new(0.0, 0.0), Point2::new(5.0, 8.0)),
            vec![LabelGuess::new("O", 0.4), LabelGuess::new("N", 0.9)],
        );
        assert_eq!(label.symbol(), "N");
    }

    #[test]
    fn unguessed_label_is_carbon() {
        let label = LabelShape::new(
            Shape::rect(Point2::new(0.0, 0.0), Point2::new(5.0, 8.0)),
            Vec::new(),
        );
        assert_eq!(label.symbol(), "C");
    }
}
