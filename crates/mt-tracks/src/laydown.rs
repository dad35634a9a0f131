//! Cyclic track laydown over the bounding box.

use mt_core::{Direction, Point, Real};
use mt_geometry::{BoundingBox, Side};

use crate::quadrature::{AzimuthalAngle, Quadrature};

/// Track endpoints before ray tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackChord {
    pub azim: usize,
    pub start: Point,
    pub end: Point,
    pub direction: Direction,
}

impl TrackChord {
    pub fn length(&self) -> Real {
        self.start.distance(self.end)
    }
}

/// All chords, grouped contiguously by azimuthal angle.
pub fn lay_tracks(bbox: &BoundingBox, quadrature: &Quadrature) -> Vec<TrackChord> {
    let total: usize = quadrature
        .azimuthal()
        .iter()
        .map(AzimuthalAngle::num_tracks)
        .sum();
    let mut chords = Vec::with_capacity(total);

    for (azim, angle) in quadrature.azimuthal().iter().enumerate() {
        let direction = angle.direction();
        for i in 0..angle.nx {
            let start = Point::new(bbox.x_min + angle.dx * (i as Real + 0.5), bbox.y_min);
            chords.push(chord(bbox, azim, start, direction));
        }
        let x0 = if direction.cos >= 0.0 {
            bbox.x_min
        } else {
            bbox.x_max
        };
        for j in 0..angle.ny {
            let start = Point::new(x0, bbox.y_min + angle.dy * (j as Real + 0.5));
            chords.push(chord(bbox, azim, start, direction));
        }
    }
    chords
}

fn chord(bbox: &BoundingBox, azim: usize, start: Point, direction: Direction) -> TrackChord {
    let to_x = if direction.cos > 0.0 {
        (bbox.x_max - start.x) / direction.cos
    } else if direction.cos < 0.0 {
        (bbox.x_min - start.x) / direction.cos
    } else {
        Real::INFINITY
    };
    let to_y = (bbox.y_max - start.y) / direction.sin;
    let mut end = start.advance(direction, to_x.min(to_y));
    // Snap the exit coordinate onto the edge it reaches.
    if to_x <= to_y {
        end.x = if direction.cos > 0.0 {
            bbox.x_max
        } else {
            bbox.x_min
        };
    } else {
        end.y = bbox.y_max;
    }
    TrackChord {
        azim,
        start,
        end,
        direction,
    }
}

/// Index of the start grid point nearest `p` along `side`.
pub(crate) fn side_slot(angle: &AzimuthalAngle, bbox: &BoundingBox, side: Side, p: Point) -> usize {
    let (offset, pitch, count) = if side.is_x() {
        (p.y - bbox.y_min, angle.dy, angle.ny)
    } else {
        (p.x - bbox.x_min, angle.dx, angle.nx)
    };
    let slot = (offset / pitch).floor().max(0.0) as usize;
    slot.min(count.saturating_sub(1))
}

/// Number of slots along `side` for one angle.
pub(crate) fn side_slots(angle: &AzimuthalAngle, side: Side) -> usize {
    if side.is_x() { angle.ny } else { angle.nx }
}
