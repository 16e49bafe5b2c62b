use serde::{Deserialize, Serialize};

use crate::config::GeometryConfig;
use crate::fragment::TextFragment;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Right,
    Below,
    Left,
    Above,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Below => "below",
            Self::Left => "left",
            Self::Above => "above",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryRelation {
    pub source_index: usize,
    pub target_index: usize,
    pub distance: f64,
    pub direction: Direction,
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
}

pub fn distance(a: &TextFragment, b: &TextFragment) -> f64 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    (bx - ax).hypot(by - ay)
}

// negative when the boxes overlap on that axis
pub fn gaps(a: &TextFragment, b: &TextFragment) -> (f64, f64) {
    (b.min_x() - a.max_x(), b.min_y() - a.max_y())
}

pub fn direction(a: &TextFragment, b: &TextFragment) -> Direction {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    // image coordinates: y grows downward
    let mut angle = (by - ay).atan2(bx - ax).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }

    if !(45.0..315.0).contains(&angle) {
        Direction::Right
    } else if angle < 135.0 {
        Direction::Below
    } else if angle < 225.0 {
        Direction::Left
    } else {
        Direction::Above
    }
}

pub fn is_neighbor(a: &TextFragment, b: &TextFragment, max_distance: f64) -> bool {
    distance(a, b) <= max_distance
}

#[derive(Debug, Clone)]
pub struct GeometryCalculator {
    max_distance: f64,
    align_tolerance: f64,
}

impl Default for GeometryCalculator {
    fn default() -> Self {
        Self::new(&GeometryConfig::default())
    }
}

impl GeometryCalculator {
    pub fn new(config: &GeometryConfig) -> Self {
        Self {
            max_distance: config.max_distance,
            align_tolerance: config.align_tolerance,
        }
    }

    pub fn relation(
        &self,
        fragments: &[TextFragment],
        source_index: usize,
        target_index: usize,
    ) -> Option<GeometryRelation> {
        let source = fragments.get(source_index)?;
        let target = fragments.get(target_index)?;
        let (horizontal_gap, vertical_gap) = gaps(source, target);

        Some(GeometryRelation {
            source_index,
            target_index,
            distance: distance(source, target),
            direction: direction(source, target),
            horizontal_gap,
            vertical_gap,
        })
    }

    pub fn find_neighbors(
        &self,
        fragments: &[TextFragment],
        target_index: usize,
        max_distance: Option<f64>,
    ) -> Vec<GeometryRelation> {
        let max_distance = max_distance.unwrap_or(self.max_distance);
        let Some(target) = fragments.get(target_index) else {
            return Vec::new();
        };
        if target.is_degenerate() {
            return Vec::new();
        }

        let mut neighbors = fragments
            .iter()
            .enumerate()
            .filter(|(index, fragment)| *index != target_index && !fragment.is_degenerate())
            .filter(|(_, fragment)| is_neighbor(target, fragment, max_distance))
            .filter_map(|(index, _)| self.relation(fragments, target_index, index))
            .collect::<Vec<GeometryRelation>>();

        neighbors.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        neighbors
    }

    pub fn find_aligned(
        &self,
        fragments: &[TextFragment],
        reference_index: usize,
        direction: Direction,
    ) -> Vec<usize> {
        let Some(reference) = fragments.get(reference_index) else {
            return Vec::new();
        };
        let (rx, ry) = reference.center();

        let mut aligned = fragments
            .iter()
            .enumerate()
            .filter(|(index, fragment)| *index != reference_index && !fragment.is_degenerate())
            .filter_map(|(index, fragment)| {
                let (cx, cy) = fragment.center();
                let (cross_offset, advance) = match direction {
                    Direction::Right => (cy - ry, cx - rx),
                    Direction::Left => (cy - ry, rx - cx),
                    Direction::Below => (cx - rx, cy - ry),
                    Direction::Above => (cx - rx, ry - cy),
                };
                (cross_offset.abs() < self.align_tolerance && advance > 0.0)
                    .then_some((index, advance))
            })
            .collect::<Vec<(usize, f64)>>();

        aligned.sort_by(|left, right| left.1.total_cmp(&right.1));
        aligned.into_iter().map(|(index, _)| index).collect()
    }
}
