//! Ray tracing a single chord into region segments.

use mt_core::{Direction, Point, Real};
use mt_geometry::Geometry;

use crate::error::{TrackError, TrackResult};
use crate::track::Segment;

/// Trace from `start` to `end`, splitting at every surface crossing.
///
/// The region of each piece is looked up slightly past the current point so
/// that a ray sitting on a surface is classified by where it is heading.
pub fn trace<G: Geometry + ?Sized>(
    geometry: &G,
    track: usize,
    start: Point,
    end: Point,
    direction: Direction,
    tolerance: Real,
    max_segments: usize,
) -> TrackResult<Vec<Segment>> {
    let length = start.distance(end);
    let mut segments: Vec<Segment> = Vec::new();
    let mut travelled = 0.0;
    let mut steps = 0usize;

    let stuck = |travelled: Real, segments: usize| TrackError::RayNotTerminated {
        track,
        travelled,
        length,
        segments,
    };

    loop {
        let remaining = length - travelled;
        if remaining <= tolerance {
            if let Some(last) = segments.last_mut() {
                last.length += remaining.max(0.0);
            }
            return Ok(segments);
        }
        if steps >= max_segments {
            return Err(stuck(travelled, segments.len()));
        }
        steps += 1;

        let here = start.advance(direction, travelled);
        let ahead = here.advance(direction, tolerance.min(0.5 * remaining));
        let region = geometry
            .region_at(ahead)
            .ok_or_else(|| stuck(travelled, segments.len()))?;
        let step = match geometry.next_crossing(here, direction) {
            Some(crossing) => crossing.distance.min(remaining),
            None => return Err(stuck(travelled, segments.len())),
        };
        if step.is_nan() || step <= 0.0 {
            return Err(stuck(travelled, segments.len()));
        }

        match segments.last_mut() {
            Some(last) if last.region == region => last.length += step,
            _ => segments.push(Segment {
                region,
                length: step,
            }),
        }
        travelled += step;
    }
}
