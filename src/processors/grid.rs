//! Mapping of points onto the integer cells of a uniform cubic grid.
//!
//! The grid is anchored at the coordinate origin: cell `(i, j, k)` covers
//! `[i*d, (i+1)*d) x [j*d, (j+1)*d) x [k*d, (k+1)*d)` for edge length `d`.

/// Integer index of a grid cell.
///
/// The derived ordering is lexicographic over `(x, y, z)`, which is the order
/// cells are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl CellKey {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Cell containing `point` for a grid of edge length `cell_size`.
///
/// Each axis is `floor(coord / cell_size)`, so negative quotients round
/// toward negative infinity (`-0.5 -> -1`). Quotients outside the `i64`
/// range saturate. A NaN quotient maps to `i64::MIN`, keeping NaN points out
/// of the cells of finite points near the origin.
#[inline]
pub fn cell_key(point: &[f32], cell_size: f32) -> CellKey {
    CellKey {
        x: axis_index(point[0], cell_size),
        y: axis_index(point[1], cell_size),
        z: axis_index(point[2], cell_size),
    }
}

#[inline]
fn axis_index(coord: f32, cell_size: f32) -> i64 {
    let q = (coord / cell_size).floor();
    if q.is_nan() {
        i64::MIN
    } else {
        q as i64
    }
}
