//! Boundary links between track ends.
//!
//! Every track end lies on a start-grid point of its side, so partners are
//! found by slot index rather than by searching coordinates.

use mt_core::{Point, Real, TrackId};
use mt_geometry::{BoundaryType, BoundingBox, Side};

use crate::error::{TrackError, TrackResult};
use crate::laydown::{side_slot, side_slots};
use crate::quadrature::Quadrature;
use crate::track::{Track, TrackLink};

/// Tracks starting and ending on each side slot, for one angle.
struct SlotTable {
    starts: [Vec<Option<usize>>; 4],
    ends: [Vec<Option<usize>>; 4],
}

impl SlotTable {
    fn new(quadrature: &Quadrature, azim: usize) -> Self {
        let angle = &quadrature.azimuthal()[azim];
        let slots = |side: Side| vec![None; side_slots(angle, side)];
        Self {
            starts: Side::ALL.map(slots),
            ends: Side::ALL.map(slots),
        }
    }
}

struct Linker<'a> {
    quadrature: &'a Quadrature,
    bbox: &'a BoundingBox,
    boundaries: [BoundaryType; 4],
    tolerance: Real,
    tables: Vec<SlotTable>,
}

/// Fill `link_forward` and `link_backward` for every track.
pub fn link_tracks(
    tracks: &mut [Track],
    quadrature: &Quadrature,
    bbox: &BoundingBox,
    boundaries: [BoundaryType; 4],
    tolerance: Real,
) -> TrackResult<()> {
    let mut linker = Linker {
        quadrature,
        bbox,
        boundaries,
        tolerance,
        tables: (0..quadrature.num_azim_half())
            .map(|a| SlotTable::new(quadrature, a))
            .collect(),
    };

    for (t, track) in tracks.iter().enumerate() {
        let angle = &quadrature.azimuthal()[track.azim];
        let start_side = linker.side(t, track.start)?;
        let end_side = linker.side(t, track.end)?;
        let table = &mut linker.tables[track.azim];
        table.starts[start_side.index()][side_slot(angle, bbox, start_side, track.start)] =
            Some(t);
        table.ends[end_side.index()][side_slot(angle, bbox, end_side, track.end)] = Some(t);
    }

    for t in 0..tracks.len() {
        let (azim, start, end) = (tracks[t].azim, tracks[t].start, tracks[t].end);
        let forward = linker.resolve(t, azim, end, true)?;
        let backward = linker.resolve(t, azim, start, false)?;
        tracks[t].link_forward = forward;
        tracks[t].link_backward = backward;
    }
    Ok(())
}

impl Linker<'_> {
    fn side(&self, track: usize, p: Point) -> TrackResult<Side> {
        self.bbox
            .side_of(p, self.tolerance)
            .ok_or(TrackError::Link {
                track,
                boundary: "domain edge",
                x: p.x,
                y: p.y,
            })
    }

    /// Link for flux leaving `track` at boundary point `p`.
    fn resolve(
        &self,
        track: usize,
        azim: usize,
        p: Point,
        leaving_forward: bool,
    ) -> TrackResult<TrackLink> {
        let side = self.side(track, p)?;
        let missing = |boundary| TrackError::Link {
            track,
            boundary,
            x: p.x,
            y: p.y,
        };
        match self.boundaries[side.index()] {
            BoundaryType::Vacuum => Ok(TrackLink::Vacuum),
            BoundaryType::Reflective => {
                let comp = self.quadrature.complement(azim);
                let slot = side_slot(&self.quadrature.azimuthal()[comp], self.bbox, side, p);
                // An x wall keeps the traversal sense on the mirrored track; a y wall flips it.
                let forward = side.is_x() == leaving_forward;
                let table = &self.tables[comp];
                let partner = if forward {
                    table.starts[side.index()][slot]
                } else {
                    table.ends[side.index()][slot]
                };
                let partner = partner.ok_or_else(|| missing("reflective"))?;
                Ok(TrackLink::Reflective {
                    track: TrackId::from_usize(partner),
                    forward,
                })
            }
            BoundaryType::Periodic => {
                let entry = side.opposite();
                let slot = side_slot(&self.quadrature.azimuthal()[azim], self.bbox, entry, p);
                let table = &self.tables[azim];
                let partner = if leaving_forward {
                    table.starts[entry.index()][slot]
                } else {
                    table.ends[entry.index()][slot]
                };
                let partner = partner.ok_or_else(|| missing("periodic"))?;
                Ok(TrackLink::Periodic {
                    track: TrackId::from_usize(partner),
                    forward: leaving_forward,
                })
            }
        }
    }
}
