//! Tracks, segments and boundary links.

use core::ops::Range;

use mt_core::{Direction, Point, Real, RegionId, TrackId};
use mt_geometry::BoundaryType;

/// A constant-region piece of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub region: RegionId,
    /// In-plane length (cm).
    pub length: Real,
}

/// Where angular flux goes when it leaves a track end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackLink {
    /// Flux leaks out; nothing comes back in.
    Vacuum,
    /// Flux continues on `track`, traversed forward or backward.
    Reflective { track: TrackId, forward: bool },
    Periodic { track: TrackId, forward: bool },
}

impl TrackLink {
    /// Receiving track and its traversal direction, if any.
    pub fn target(&self) -> Option<(TrackId, bool)> {
        match *self {
            TrackLink::Vacuum => None,
            TrackLink::Reflective { track, forward } | TrackLink::Periodic { track, forward } => {
                Some((track, forward))
            }
        }
    }

    pub fn boundary(&self) -> BoundaryType {
        match self {
            TrackLink::Vacuum => BoundaryType::Vacuum,
            TrackLink::Reflective { .. } => BoundaryType::Reflective,
            TrackLink::Periodic { .. } => BoundaryType::Periodic,
        }
    }
}

/// A straight chord across the domain at one azimuthal angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    /// Index of the azimuthal angle in [0, π).
    pub azim: usize,
    pub start: Point,
    pub end: Point,
    pub direction: Direction,
    pub length: Real,
    pub(crate) segments: Range<usize>,
    /// Link followed when leaving through `end`.
    pub link_forward: TrackLink,
    /// Link followed when leaving through `start`.
    pub link_backward: TrackLink,
}

impl Track {
    /// Range of this track's segments in the flat segment array.
    pub fn segment_range(&self) -> Range<usize> {
        self.segments.clone()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Link taken when leaving in the given traversal direction.
    pub fn link(&self, forward: bool) -> TrackLink {
        if forward {
            self.link_forward
        } else {
            self.link_backward
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_targets() {
        let t = TrackId::from_index(3);
        assert_eq!(TrackLink::Vacuum.target(), None);
        assert_eq!(
            TrackLink::Reflective {
                track: t,
                forward: false
            }
            .target(),
            Some((t, false))
        );
        assert_eq!(
            TrackLink::Periodic {
                track: t,
                forward: true
            }
            .boundary(),
            BoundaryType::Periodic
        );
    }
}
