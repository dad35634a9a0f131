//! Track generation driver and the resulting [`TrackSet`].

use core::ops::Range;

use mt_core::timing::{Timer, moc_timing};
use mt_core::{Direction, Point, Real, TrackId};
use mt_geometry::{BoundaryType, BoundingBox, Geometry, Side};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{TrackError, TrackResult};
use crate::laydown::{self, TrackChord};
use crate::linking;
use crate::options::TrackOptions;
use crate::quadrature::{PolarQuadrature, Quadrature};
use crate::raytrace;
use crate::track::{Segment, Track, TrackLink};

/// Lays down, traces and links tracks over a geometry.
pub struct TrackGenerator<'g, G: Geometry + ?Sized> {
    geometry: &'g G,
    options: TrackOptions,
}

impl<'g, G: Geometry + ?Sized> TrackGenerator<'g, G> {
    pub fn new(geometry: &'g G, options: TrackOptions) -> TrackResult<Self> {
        options.validate()?;
        Ok(Self { geometry, options })
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    pub fn generate(&self) -> TrackResult<TrackSet> {
        let timer = Timer::start("ray_tracing");
        let opts = &self.options;
        let bbox = self.geometry.bounding_box();
        let polar = PolarQuadrature::new(opts.polar_kind, opts.num_polar)?;
        let quadrature = Quadrature::new(&bbox, opts.num_azim, opts.spacing, polar)?;
        for (a, angle) in quadrature.azimuthal().iter().enumerate() {
            debug!(
                azim = a,
                phi = angle.phi,
                nx = angle.nx,
                ny = angle.ny,
                spacing = angle.spacing,
                "azimuthal angle"
            );
        }

        let chords = laydown::lay_tracks(&bbox, &quadrature);
        let traced = self.trace_all(&chords)?;

        let mut tracks = Vec::with_capacity(chords.len());
        let mut segments = Vec::with_capacity(traced.iter().map(Vec::len).sum());
        for (t, (chord, pieces)) in chords.iter().zip(traced).enumerate() {
            let first = segments.len();
            segments.extend(pieces);
            tracks.push(Track {
                id: TrackId::from_usize(t),
                azim: chord.azim,
                start: chord.start,
                end: chord.end,
                direction: chord.direction,
                length: chord.length(),
                segments: first..segments.len(),
                link_forward: TrackLink::Vacuum,
                link_backward: TrackLink::Vacuum,
            });
        }

        let boundaries = Side::ALL.map(|side| self.geometry.boundary_type(side));
        let link_tol = opts
            .tolerance
            .max(1e-10 * bbox.width().max(bbox.height()));
        linking::link_tracks(&mut tracks, &quadrature, &bbox, boundaries, link_tol)?;

        let mut azim_offsets = Vec::with_capacity(quadrature.num_azim_half() + 1);
        azim_offsets.push(0);
        for angle in quadrature.azimuthal() {
            let last = azim_offsets.last().copied().unwrap_or(0);
            azim_offsets.push(last + angle.num_tracks());
        }

        let num_regions = self.geometry.num_regions();
        let integrals = integrate_regions(&tracks, &segments, &quadrature, num_regions)?;

        timer.stop_into(&moc_timing::RAY_TRACING);
        info!(
            tracks = tracks.len(),
            segments = segments.len(),
            regions = num_regions,
            azimuthal = quadrature.num_azim_half() * 2,
            polar = quadrature.num_polar_half() * 2,
            "track generation complete"
        );

        Ok(TrackSet {
            quadrature,
            bbox,
            boundaries,
            tracks,
            segments,
            azim_offsets,
            volumes: integrals.volumes,
            centroids: integrals.centroids,
            moments: integrals.moments,
        })
    }

    fn trace_all(&self, chords: &[TrackChord]) -> TrackResult<Vec<Vec<Segment>>> {
        let opts = &self.options;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.num_threads)
            .build()
            .map_err(|e| TrackError::ThreadPool {
                message: e.to_string(),
            })?;
        let geometry = self.geometry;
        pool.install(|| {
            chords
                .par_iter()
                .enumerate()
                .map(|(t, chord)| {
                    raytrace::trace(
                        geometry,
                        t,
                        chord.start,
                        chord.end,
                        chord.direction,
                        opts.tolerance,
                        opts.max_segments_per_track,
                    )
                })
                .collect()
        })
    }
}

struct RegionIntegrals {
    volumes: Vec<Real>,
    centroids: Vec<Point>,
    moments: Vec<[Real; 3]>,
}

/// Calls `visit(region, weight, length, midpoint, direction)` for every segment,
/// with `weight = ω_a·δ_a` of the owning track's angle.
fn for_each_piece(
    tracks: &[Track],
    segments: &[Segment],
    quadrature: &Quadrature,
    num_regions: usize,
    mut visit: impl FnMut(usize, Real, Real, Point, Direction),
) -> TrackResult<()> {
    for track in tracks {
        let angle = &quadrature.azimuthal()[track.azim];
        let weight = angle.weight * angle.spacing;
        let mut s = 0.0;
        for seg in &segments[track.segment_range()] {
            let r = seg.region.idx();
            if r >= num_regions {
                return Err(TrackError::RegionOutOfRange {
                    region: r,
                    num_regions,
                });
            }
            let mid = track.start.advance(track.direction, s + 0.5 * seg.length);
            visit(r, weight, seg.length, mid, track.direction);
            s += seg.length;
        }
    }
    Ok(())
}

/// Track-length estimates of region volume, centroid and second moments.
fn integrate_regions(
    tracks: &[Track],
    segments: &[Segment],
    quadrature: &Quadrature,
    num_regions: usize,
) -> TrackResult<RegionIntegrals> {
    let mut volumes = vec![0.0; num_regions];
    let mut first = vec![Point::default(); num_regions];
    for_each_piece(tracks, segments, quadrature, num_regions, |r, w, len, mid, _| {
        volumes[r] += w * len;
        first[r].x += w * len * mid.x;
        first[r].y += w * len * mid.y;
    })?;

    if let Some(region) = volumes.iter().position(|&v| v <= 0.0) {
        return Err(TrackError::ZeroVolume { region });
    }
    let centroids: Vec<Point> = first
        .iter()
        .zip(&volumes)
        .map(|(m, v)| Point::new(m.x / v, m.y / v))
        .collect();

    let mut moments = vec![[0.0; 3]; num_regions];
    for_each_piece(tracks, segments, quadrature, num_regions, |r, w, len, mid, u| {
        let d = mid - centroids[r];
        // Spread of the chord about its midpoint.
        let spread = len * len / 12.0;
        let wl = w * len;
        moments[r][0] += wl * (d.x * d.x + u.cos * u.cos * spread);
        moments[r][1] += wl * (d.x * d.y + u.cos * u.sin * spread);
        moments[r][2] += wl * (d.y * d.y + u.sin * u.sin * spread);
    })?;
    for (m, v) in moments.iter_mut().zip(&volumes) {
        for entry in m.iter_mut() {
            *entry /= v;
        }
    }

    Ok(RegionIntegrals {
        volumes,
        centroids,
        moments,
    })
}

/// Immutable output of track generation.
#[derive(Debug, Clone)]
pub struct TrackSet {
    quadrature: Quadrature,
    bbox: BoundingBox,
    boundaries: [BoundaryType; 4],
    tracks: Vec<Track>,
    segments: Vec<Segment>,
    azim_offsets: Vec<usize>,
    volumes: Vec<Real>,
    centroids: Vec<Point>,
    moments: Vec<[Real; 3]>,
}

impl TrackSet {
    pub fn quadrature(&self) -> &Quadrature {
        &self.quadrature
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn boundary_type(&self, side: Side) -> BoundaryType {
        self.boundaries[side.index()]
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> &Track {
        &self.tracks[id.idx()]
    }

    /// Segments of `track` in path order from start to end.
    pub fn segments(&self, track: &Track) -> &[Segment] {
        &self.segments[track.segment_range()]
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn num_regions(&self) -> usize {
        self.volumes.len()
    }

    /// Indices of the tracks belonging to azimuthal angle `azim`.
    pub fn azim_tracks(&self, azim: usize) -> Range<usize> {
        self.azim_offsets[azim]..self.azim_offsets[azim + 1]
    }

    pub fn volumes(&self) -> &[Real] {
        &self.volumes
    }

    pub fn centroids(&self) -> &[Point] {
        &self.centroids
    }

    /// Second central moments per unit volume as `[xx, xy, yy]`.
    pub fn moments(&self) -> &[[Real; 3]] {
        &self.moments
    }
}
