//! Grid scan over a map's buildable area.
//!
//! Points are generated by integer step index so accumulated float error
//! never drops or duplicates a row.

use crate::level::AreaBounds;

/// Row-major scan: x outer, z inner, margin-inset from the bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridScan {
    start_x: f32,
    start_z: f32,
    spacing: f32,
    steps_x: usize,
    steps_z: usize,
    floor_y: f32,
}

impl GridScan {
    pub fn new(area: AreaBounds, margin: f32, spacing: f32) -> Self {
        let min = area.min();
        let max = area.max();
        let start_x = min.x + margin;
        let start_z = min.z + margin;
        Self {
            start_x,
            start_z,
            spacing,
            steps_x: step_count(start_x, max.x - margin, spacing),
            steps_z: step_count(start_z, max.z - margin, spacing),
            floor_y: min.y,
        }
    }

    /// Height the downward probes are measured from
    pub fn floor_y(&self) -> f32 {
        self.floor_y
    }

    pub fn len(&self) -> usize {
        self.steps_x * self.steps_z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        (0..self.steps_x).flat_map(move |i| {
            let x = self.start_x + i as f32 * self.spacing;
            (0..self.steps_z).map(move |j| (x, self.start_z + j as f32 * self.spacing))
        })
    }
}

/// Number of points `start + i * spacing` that stay `<= end`
fn step_count(start: f32, end: f32, spacing: f32) -> usize {
    if spacing <= 0.0 || end < start {
        return 0;
    }
    ((end - start) / spacing + 1e-4).floor() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(extent: f32) -> AreaBounds {
        AreaBounds {
            min: [-extent / 2.0, 0.0, -extent / 2.0],
            max: [extent / 2.0, 0.0, extent / 2.0],
        }
    }

    #[test]
    fn test_step_count_inclusive_end() {
        assert_eq!(step_count(0.0, 10.0, 1.0), 11);
        assert_eq!(step_count(0.0, 10.0, 3.0), 4);
        assert_eq!(step_count(0.0, 0.0, 1.0), 1);
        assert_eq!(step_count(1.0, 0.0, 1.0), 0);
        assert_eq!(step_count(0.0, 1.0, 0.0), 0);
    }

    #[test]
    fn test_points_row_major_with_margin() {
        let scan = GridScan::new(area(4.0), 1.0, 1.0);
        let points: Vec<_> = scan.points().collect();
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], (-1.0, -1.0));
        assert_eq!(points[1], (-1.0, 0.0));
        assert_eq!(points[3], (0.0, -1.0));
        assert_eq!(points[8], (1.0, 1.0));
    }

    #[test]
    fn test_fractional_spacing_reaches_far_edge() {
        let scan = GridScan::new(area(3.0), 0.0, 0.1);
        assert_eq!(scan.len(), 31 * 31);
        let (x, z) = scan.points().last().unwrap();
        assert!((x - 1.5).abs() < 1e-4 && (z - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_margin_larger_than_area_is_empty() {
        let scan = GridScan::new(area(1.0), 1.0, 1.0);
        assert!(scan.is_empty());
        assert_eq!(scan.points().count(), 0);
    }
}
