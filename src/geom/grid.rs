use std::ops::RangeInclusive;

use geo::{coord, Rect};

/// Pack two signed cell coordinates into a single map key.
#[inline]
pub(crate) fn cell_key(cx: i32, cy: i32) -> u64 {
    ((cx as u32 as u64) << 32) | cy as u32 as u64
}

/// A uniform `cols × rows` grid laid over a rectangle.
#[derive(Debug, Clone)]
pub(crate) struct Grid {
    x0: f64,
    y0: f64,
    cell_w: f64,
    cell_h: f64,
    cols: i32,
    rows: i32,
}

impl Grid {
    /// Grid with `cells` columns and rows over `bounds` grown by `padding` on every side.
    pub(crate) fn new(bounds: Rect<f64>, cells: usize, padding: f64) -> Self {
        let cells = cells.clamp(1, i32::MAX as usize) as i32;
        let (x0, y0) = (bounds.min().x - padding, bounds.min().y - padding);
        let width = (bounds.width() + 2.0 * padding).max(f64::EPSILON);
        let height = (bounds.height() + 2.0 * padding).max(f64::EPSILON);
        Self {
            x0,
            y0,
            cell_w: width / cells as f64,
            cell_h: height / cells as f64,
            cols: cells,
            rows: cells,
        }
    }

    #[inline] fn column(&self, x: f64) -> i32 { ((x - self.x0) / self.cell_w).floor() as i32 }

    #[inline] fn row(&self, y: f64) -> i32 { ((y - self.y0) / self.cell_h).floor() as i32 }

    /// Cell containing `(x, y)`, or `None` outside the grid.
    #[inline]
    pub(crate) fn cell_of(&self, x: f64, y: f64) -> Option<(i32, i32)> {
        if !(x.is_finite() && y.is_finite()) { return None }
        let (cx, cy) = (self.column(x), self.row(y));
        ((0..self.cols).contains(&cx) && (0..self.rows).contains(&cy)).then_some((cx, cy))
    }

    /// Columns and rows touched by `rect`, clamped to the grid.
    pub(crate) fn cells_covering(&self, rect: &Rect<f64>) -> (RangeInclusive<i32>, RangeInclusive<i32>) {
        let clamp_x = |v: i32| v.clamp(0, self.cols - 1);
        let clamp_y = |v: i32| v.clamp(0, self.rows - 1);
        (
            clamp_x(self.column(rect.min().x))..=clamp_x(self.column(rect.max().x)),
            clamp_y(self.row(rect.min().y))..=clamp_y(self.row(rect.max().y)),
        )
    }

    /// Rectangle of cell `(cx, cy)`.
    pub(crate) fn cell_rect(&self, cx: i32, cy: i32) -> Rect<f64> {
        let x = self.x0 + cx as f64 * self.cell_w;
        let y = self.y0 + cy as f64 * self.cell_h;
        Rect::new(coord! { x: x, y: y }, coord! { x: x + self.cell_w, y: y + self.cell_h })
    }
}
