use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::grid::PixelGrid;
use crate::error::Result;
use crate::geometry::{Shape, ShapeKind};
use crate::math::Point2;
use crate::union_find::UnionFind;

/// Parameters for [`ComponentLabeler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelingParams {
    /// Upper bound on provisional labels issued during the raster scan.
    pub max_labels: usize,
}

impl Default for LabelingParams {
    fn default() -> Self {
        Self {
            max_labels: u16::MAX as usize,
        }
    }
}

/// One 8-connected foreground component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Label in `1..=n`, in order of first raster appearance.
    pub id: u32,
    pub pixel_count: usize,
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Component {
    #[must_use]
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    /// Box covering the full extent of the member pixels.
    #[must_use]
    pub fn bounding_box(&self) -> Shape {
        Shape::rect(
            Point2::new(f64::from(self.min_x) - 0.5, f64::from(self.min_y) - 0.5),
            Point2::new(f64::from(self.max_x) + 0.5, f64::from(self.max_y) + 0.5),
        )
    }
}

/// Result of connected-component labeling.
#[derive(Debug, Clone)]
pub struct Labeling {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    components: Vec<Component>,
    truncated: bool,
}

impl Labeling {
    /// Component id at `(x, y)`, `0` for background or unlabeled pixels.
    #[must_use]
    pub fn label(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.labels[y as usize * self.width + x as usize]
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, id: u32) -> Option<&Component> {
        id.checked_sub(1)
            .and_then(|i| self.components.get(i as usize))
    }

    /// `true` when the label space ran out and part of the image was left
    /// unlabeled.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Member pixels of component `id` in raster order.
    #[must_use]
    pub fn pixels(&self, id: u32) -> Vec<(i32, i32)> {
        let Some(c) = self.component(id) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(c.pixel_count);
        for y in c.min_y..=c.max_y {
            for x in c.min_x..=c.max_x {
                if self.label(x, y) == id {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Outline of component `id`.
    ///
    /// # Errors
    ///
    /// Propagates hull construction failures.
    pub fn shape(&self, id: u32, kind: ShapeKind) -> Result<Option<Shape>> {
        let Some(c) = self.component(id) else {
            return Ok(None);
        };
        match kind {
            ShapeKind::Box => Ok(Some(c.bounding_box())),
            ShapeKind::ConvexPolygon => {
                // Only the leftmost and rightmost pixel of each row can sit on the hull.
                let mut corners = Vec::new();
                for y in c.min_y..=c.max_y {
                    let row: Vec<i32> = (c.min_x..=c.max_x)
                        .filter(|&x| self.label(x, y) == id)
                        .collect();
                    let (Some(&left), Some(&right)) = (row.first(), row.last()) else {
                        continue;
                    };
                    for x in [left, right] {
                        let (fx, fy) = (f64::from(x), f64::from(y));
                        corners.push(Point2::new(fx - 0.5, fy - 0.5));
                        corners.push(Point2::new(fx + 0.5, fy - 0.5));
                        corners.push(Point2::new(fx - 0.5, fy + 0.5));
                        corners.push(Point2::new(fx + 0.5, fy + 0.5));
                    }
                }
                Shape::hull_of(&corners).map(Some)
            }
        }
    }

    /// Outlines of all components, in id order.
    ///
    /// # Errors
    ///
    /// Propagates hull construction failures.
    pub fn shapes(&self, kind: ShapeKind) -> Result<Vec<Shape>> {
        let mut out = Vec::with_capacity(self.components.len());
        for c in &self.components {
            if let Some(s) = self.shape(c.id, kind)? {
                out.push(s);
            }
        }
        Ok(out)
    }
}

/// Two-pass union-find connected-component labeling (8-connectivity).
#[derive(Debug, Default)]
pub struct ComponentLabeler {
    params: LabelingParams,
}

impl ComponentLabeler {
    #[must_use]
    pub fn new(params: LabelingParams) -> Self {
        Self { params }
    }

    /// Labels every foreground pixel of `grid`.
    ///
    /// Running out of provisional labels is not fatal: the scan stops, the
    /// rest of the image stays unlabeled and the result is flagged as
    /// truncated.
    #[must_use]
    pub fn execute(&self, grid: &PixelGrid) -> Labeling {
        let (width, height) = (grid.width(), grid.height());
        let mut provisional = vec![0u32; width * height];
        let mut uf = UnionFind::default();
        let mut truncated = false;

        'scan: for y in 0..height as i32 {
            for x in 0..width as i32 {
                if !grid.get(x, y) {
                    continue;
                }
                let at = |px: i32, py: i32| {
                    if px < 0 || py < 0 || px as usize >= width {
                        0
                    } else {
                        provisional[py as usize * width + px as usize]
                    }
                };
                let neighbors = [at(x - 1, y), at(x - 1, y - 1), at(x, y - 1), at(x + 1, y - 1)];

                let mut label = 0u32;
                for &n in neighbors.iter().filter(|&&n| n != 0) {
                    if label == 0 {
                        label = n;
                    } else if n != label {
                        uf.union(label as usize - 1, n as usize - 1);
                    }
                }
                if label == 0 {
                    if uf.len() >= self.params.max_labels {
                        warn!(
                            max_labels = self.params.max_labels,
                            row = y,
                            "component label space exhausted, rest of image left unlabeled"
                        );
                        truncated = true;
                        break 'scan;
                    }
                    label = u32::try_from(uf.push() + 1).unwrap_or(u32::MAX);
                }
                provisional[y as usize * width + x as usize] = label;
            }
        }

        // Resolve roots and compact ids in order of first appearance.
        let mut compact = vec![0u32; uf.len()];
        let mut components: Vec<Component> = Vec::new();
        let mut labels = vec![0u32; width * height];
        for (idx, &p) in provisional.iter().enumerate() {
            if p == 0 {
                continue;
            }
            let root = uf.find(p as usize - 1);
            if compact[root] == 0 {
                compact[root] = u32::try_from(components.len() + 1).unwrap_or(u32::MAX);
                components.push(Component {
                    id: compact[root],
                    pixel_count: 0,
                    min_x: i32::MAX,
                    min_y: i32::MAX,
                    max_x: i32::MIN,
                    max_y: i32::MIN,
                });
            }
            let id = compact[root];
            labels[idx] = id;
            let (x, y) = ((idx % width) as i32, (idx / width) as i32);
            let c = &mut components[id as usize - 1];
            c.pixel_count += 1;
            c.min_x = c.min_x.min(x);
            c.min_y = c.min_y.min(y);
            c.max_x = c.max_x.max(x);
            c.max_y = c.max_y.max(y);
        }

        debug!(
            components = components.len(),
            provisional = uf.len(),
            truncated,
            "labeled connected components"
        );

        Labeling {
            width,
            height,
            labels,
            components,
            truncated,
        }
    }
}
