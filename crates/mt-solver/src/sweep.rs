//! Transport sweep over all tracks, directions, polar angles and groups.
//!
//! Tracks are split into contiguous azimuthal partitions, one per worker.
//! Each partition tallies into its own accumulator and writes only its own
//! slice of the outgoing boundary flux; accumulators are summed in partition
//! order afterwards. Incoming boundary flux always comes from the previous
//! sweep, so partitions never read each other's output mid-sweep.

use core::f64::consts::PI;
use core::ops::Range;

use mt_core::timing::{Timer, moc_timing};
use mt_core::{Direction, Point, Real};
use mt_tracks::{Segment, TrackSet};
use rayon::prelude::*;
use tracing::debug;

use crate::cmfd::{CurrentEvent, SurfaceMap};
use crate::error::{SolverError, SolverResult};
use crate::exponentials::{f1, linear_terms};
use crate::fsr::FsrTable;
use crate::options::SourceMode;

const INV_4PI: Real = 0.25 / PI;

/// Region tallies from one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepTally {
    /// Σ W·Δψ per region and group.
    pub flux: Vec<Real>,
    /// First-moment tallies per region and group (linear sources only).
    pub moments: Vec<[Real; 2]>,
    /// Σ W·ψ_out over vacuum exits, all groups.
    pub leakage: Real,
    /// Partial currents through coarse mesh faces, outgoing then incoming,
    /// per face and coarse group. Empty without CMFD.
    pub currents: Vec<Real>,
}

impl SweepTally {
    fn new(size: usize, linear: bool) -> Self {
        Self {
            flux: vec![0.0; size],
            moments: if linear {
                vec![[0.0; 2]; size]
            } else {
                Vec::new()
            },
            leakage: 0.0,
            currents: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.flux.fill(0.0);
        self.moments.fill([0.0; 2]);
        self.leakage = 0.0;
        self.currents.fill(0.0);
    }

    fn add(&mut self, other: &SweepTally) {
        for (a, b) in self.flux.iter_mut().zip(&other.flux) {
            *a += b;
        }
        for (a, b) in self.moments.iter_mut().zip(&other.moments) {
            a[0] += b[0];
            a[1] += b[1];
        }
        self.leakage += other.leakage;
        for (a, b) in self.currents.iter_mut().zip(&other.currents) {
            *a += b;
        }
    }
}

/// Per-partition scratch and tallies.
#[derive(Debug, Clone)]
struct Accumulator {
    psi: Vec<Real>,
    tally: SweepTally,
}

/// Read-only data shared by all partitions during a sweep.
struct SweepContext<'a> {
    tracks: &'a TrackSet,
    sigma_t: &'a [Real],
    source: &'a [Real],
    source_moments: &'a [[Real; 2]],
    centroids: &'a [Point],
    incoming: &'a [Real],
    vacuum_exit: &'a [bool],
    surfaces: Option<&'a SurfaceMap>,
    num_groups: usize,
    num_polar: usize,
}

/// One segment as seen by a traversal direction.
#[derive(Debug, Clone, Copy)]
struct Piece {
    length: Real,
    /// Midpoint relative to the region centroid (linear kernels only).
    mid: Point,
    direction: Direction,
}

/// Segment attenuation and tally for one polar angle and group.
trait SegmentKernel {
    const LINEAR: bool;

    fn attenuate(
        ctx: &SweepContext<'_>,
        tally: &mut SweepTally,
        rg: usize,
        piece: &Piece,
        sin_theta: Real,
        weight: Real,
        psi: &mut Real,
    );
}

struct FlatKernel;

impl SegmentKernel for FlatKernel {
    const LINEAR: bool = false;

    #[inline]
    fn attenuate(
        ctx: &SweepContext<'_>,
        tally: &mut SweepTally,
        rg: usize,
        piece: &Piece,
        sin_theta: Real,
        weight: Real,
        psi: &mut Real,
    ) {
        let sigma = ctx.sigma_t[rg];
        let tau = sigma * piece.length / sin_theta;
        let delta = (*psi - ctx.source[rg] * INV_4PI / sigma) * f1(tau);
        *psi -= delta;
        tally.flux[rg] += weight * delta;
    }
}

struct LinearKernel;

impl SegmentKernel for LinearKernel {
    const LINEAR: bool = true;

    #[inline]
    fn attenuate(
        ctx: &SweepContext<'_>,
        tally: &mut SweepTally,
        rg: usize,
        piece: &Piece,
        sin_theta: Real,
        weight: Real,
        psi: &mut Real,
    ) {
        let sigma = ctx.sigma_t[rg];
        let path = piece.length / sin_theta;
        let tau = sigma * path;
        let (f, g2, h2) = linear_terms(tau);

        let [qx, qy] = ctx.source_moments[rg];
        let u = piece.direction;
        let q0 = (ctx.source[rg] + qx * piece.mid.x + qy * piece.mid.y) * INV_4PI;
        let q1 = (qx * u.cos + qy * u.sin) * sin_theta * INV_4PI;

        let sigma2 = sigma * sigma;
        let a = *psi - q0 / sigma;
        let delta = a * f - q1 * g2 / sigma2;
        // ∫ (s - L/2) ψ(s) ds along the 3D path
        let first = (q1 * h2 / sigma2 - a * g2) / sigma2;
        let mean = (q0 * path + delta) / sigma;

        *psi -= delta;
        tally.flux[rg] += weight * delta;
        let m = &mut tally.moments[rg];
        m[0] += weight * (piece.mid.x * mean + u.cos * sin_theta * first);
        m[1] += weight * (piece.mid.y * mean + u.sin * sin_theta * first);
    }
}

/// Boundary flux state and worker partitions for repeated sweeps.
pub struct SweepEngine {
    num_groups: usize,
    num_polar: usize,
    mode: SourceMode,
    pool: rayon::ThreadPool,
    partitions: Vec<Range<usize>>,
    accumulators: Vec<Accumulator>,
    total: SweepTally,
    /// Flux entering each (track, direction), from the previous sweep.
    incoming: Vec<Real>,
    /// Flux leaving each (track, direction) in the current sweep.
    outgoing: Vec<Real>,
    /// Outgoing (track, direction) slot feeding each incoming slot.
    feeders: Vec<Option<usize>>,
    vacuum_exit: Vec<bool>,
    surfaces: Option<SurfaceMap>,
}

impl SweepEngine {
    pub fn new(
        tracks: &TrackSet,
        num_groups: usize,
        mode: SourceMode,
        num_threads: usize,
    ) -> SolverResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| SolverError::Configuration {
                what: format!("thread pool: {e}"),
            })?;

        let num_polar = tracks.quadrature().num_polar_half();
        let partitions = partition_tracks(tracks, num_threads);
        let size = tracks.num_regions() * num_groups;
        let linear = mode == SourceMode::Linear;
        let accumulators = partitions
            .iter()
            .map(|_| Accumulator {
                psi: vec![0.0; num_polar * num_groups],
                tally: SweepTally::new(size, linear),
            })
            .collect();

        let slots = 2 * tracks.num_tracks();
        let mut feeders = vec![None; slots];
        let mut vacuum_exit = vec![false; slots];
        for (t, track) in tracks.tracks().iter().enumerate() {
            for (dir, forward) in [(0, true), (1, false)] {
                match track.link(forward).target() {
                    Some((next, next_forward)) => {
                        let entry = 2 * next.idx() + usize::from(!next_forward);
                        feeders[entry] = Some(2 * t + dir);
                    }
                    None => vacuum_exit[2 * t + dir] = true,
                }
            }
        }
        debug!(
            partitions = partitions.len(),
            vacuum_exits = vacuum_exit.iter().filter(|&&v| v).count(),
            "sweep engine ready"
        );

        let flux_len = slots * num_polar * num_groups;
        Ok(Self {
            num_groups,
            num_polar,
            mode,
            pool,
            partitions,
            accumulators,
            total: SweepTally::new(size, linear),
            incoming: vec![0.0; flux_len],
            outgoing: vec![0.0; flux_len],
            feeders,
            vacuum_exit,
            surfaces: None,
        })
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Zero all boundary angular flux.
    pub fn reset_boundary(&mut self) {
        self.incoming.fill(0.0);
        self.outgoing.fill(0.0);
    }

    /// Scale all boundary angular flux, e.g. after flux normalization.
    pub fn scale_boundary(&mut self, factor: Real) {
        for v in self.incoming.iter_mut().chain(self.outgoing.iter_mut()) {
            *v *= factor;
        }
    }

    /// Scale incoming boundary flux by `factor(slot, group)`, where a slot is
    /// `2 * track + direction`.
    pub fn scale_incoming(&mut self, factor: impl Fn(usize, usize) -> Real) {
        let g_count = self.num_groups;
        let pg = self.num_polar * g_count;
        for (slot, flux) in self.incoming.chunks_mut(pg.max(1)).enumerate() {
            for (i, v) in flux.iter_mut().enumerate() {
                *v *= factor(slot, i % g_count);
            }
        }
    }

    /// Tally partial currents through coarse mesh faces from now on.
    pub(crate) fn set_surface_map(&mut self, map: SurfaceMap) {
        let len = map.tally_len();
        for acc in &mut self.accumulators {
            acc.tally.currents = vec![0.0; len];
        }
        self.total.currents = vec![0.0; len];
        self.surfaces = Some(map);
    }

    /// Sweep every track once with the sources in `fsr`.
    ///
    /// `sigma_t` holds Σt per region and group.
    pub fn sweep(
        &mut self,
        tracks: &TrackSet,
        fsr: &FsrTable,
        sigma_t: &[Real],
    ) -> &SweepTally {
        let timer = Timer::start("sweep");
        let ctx = SweepContext {
            tracks,
            sigma_t,
            source: fsr.source(),
            source_moments: fsr.source_moments(),
            centroids: fsr.centroids(),
            incoming: &self.incoming,
            vacuum_exit: &self.vacuum_exit,
            surfaces: self.surfaces.as_ref(),
            num_groups: self.num_groups,
            num_polar: self.num_polar,
        };

        let stride = 2 * self.num_polar * self.num_groups;
        let mut rest: &mut [Real] = &mut self.outgoing;
        let mut jobs = Vec::with_capacity(self.partitions.len());
        for (range, acc) in self.partitions.iter().zip(self.accumulators.iter_mut()) {
            let (head, tail) = core::mem::take(&mut rest).split_at_mut(range.len() * stride);
            rest = tail;
            acc.tally.clear();
            jobs.push((range.clone(), head, acc));
        }

        let mode = self.mode;
        self.pool.install(|| {
            jobs.into_par_iter().for_each(|(range, out, acc)| match mode {
                SourceMode::Flat => sweep_partition::<FlatKernel>(&ctx, range, out, acc),
                SourceMode::Linear => sweep_partition::<LinearKernel>(&ctx, range, out, acc),
            })
        });
        timer.stop_into(&moc_timing::SWEEP);

        let timer = Timer::start("reduction");
        self.total.clear();
        for acc in &self.accumulators {
            self.total.add(&acc.tally);
        }
        timer.stop_into(&moc_timing::REDUCTION);
        &self.total
    }

    /// Move this sweep's outgoing flux into the incoming slots it feeds.
    pub fn exchange(&mut self) {
        let pg = self.num_polar * self.num_groups;
        for (slot, feeder) in self.feeders.iter().enumerate() {
            let dst = &mut self.incoming[slot * pg..(slot + 1) * pg];
            match feeder {
                Some(src) => dst.copy_from_slice(&self.outgoing[src * pg..(src + 1) * pg]),
                None => dst.fill(0.0),
            }
        }
    }
}

/// Contiguous azimuthal-angle blocks with roughly equal track counts.
fn partition_tracks(tracks: &TrackSet, num_threads: usize) -> Vec<Range<usize>> {
    let num_azim = tracks.quadrature().num_azim_half();
    let parts = num_threads.clamp(1, num_azim.max(1));
    let total = tracks.num_tracks();
    let mut partitions = Vec::with_capacity(parts);
    let mut start = 0;
    let mut azim = 0;
    for p in 0..parts {
        let target = total * (p + 1) / parts;
        let mut end = start;
        // Leave at least one angle for every remaining partition.
        let last_allowed = num_azim - (parts - p - 1);
        while azim < last_allowed && (end < target || end == start) {
            end = tracks.azim_tracks(azim).end;
            azim += 1;
        }
        partitions.push(start..end);
        start = end;
    }
    partitions
}

fn sweep_partition<K: SegmentKernel>(
    ctx: &SweepContext<'_>,
    range: Range<usize>,
    out: &mut [Real],
    acc: &mut Accumulator,
) {
    let pg = ctx.num_polar * ctx.num_groups;
    let sins = ctx.tracks.quadrature().polar().sin_theta();
    for (local, t) in range.enumerate() {
        let track = &ctx.tracks.tracks()[t];
        let segments = ctx.tracks.segments(track);
        let weights = ctx.tracks.quadrature().total_weights(track.azim);

        for dir in 0..2 {
            let slot = 2 * t + dir;
            acc.psi
                .copy_from_slice(&ctx.incoming[slot * pg..(slot + 1) * pg]);
            let events = ctx.surfaces.map_or(&[][..], |m| m.slot_events(slot));
            if dir == 0 {
                let entry = (track.start, track.direction);
                traverse::<K, _>(ctx, segments.iter(), entry, sins, weights, events, acc);
            } else {
                let entry = (track.end, track.direction.reversed());
                traverse::<K, _>(ctx, segments.iter().rev(), entry, sins, weights, events, acc);
            }

            let local_slot = 2 * local + dir;
            out[local_slot * pg..(local_slot + 1) * pg].copy_from_slice(&acc.psi);
            if ctx.vacuum_exit[slot] {
                let leaked: Real = acc
                    .psi
                    .chunks(ctx.num_groups)
                    .zip(weights)
                    .map(|(psi, w)| w * psi.iter().sum::<Real>())
                    .sum();
                acc.tally.leakage += leaked;
            }
        }
    }
}

fn traverse<'s, K: SegmentKernel, I: Iterator<Item = &'s Segment>>(
    ctx: &SweepContext<'_>,
    segments: I,
    (entry, direction): (Point, Direction),
    sins: &[Real],
    weights: &[Real],
    events: &[CurrentEvent],
    acc: &mut Accumulator,
) {
    let g_count = ctx.num_groups;
    let mut s = 0.0;
    let mut next = tally_currents(ctx, events, 0, 0, weights, acc);
    for (done, seg) in segments.enumerate() {
        let r = seg.region.idx();
        let mid = if K::LINEAR {
            entry.advance(direction, s + 0.5 * seg.length) - ctx.centroids[r]
        } else {
            Point::default()
        };
        s += seg.length;
        let piece = Piece {
            length: seg.length,
            mid,
            direction,
        };
        for (p, (&sin, &w)) in sins.iter().zip(weights).enumerate() {
            let psi = &mut acc.psi[p * g_count..(p + 1) * g_count];
            for (g, psi) in psi.iter_mut().enumerate() {
                K::attenuate(ctx, &mut acc.tally, r * g_count + g, &piece, sin, w, psi);
            }
        }
        next = tally_currents(ctx, events, next, done + 1, weights, acc);
    }
}

/// Tally the angular flux of every event due after `done` segments as a
/// current. Returns the index of the next pending event.
fn tally_currents(
    ctx: &SweepContext<'_>,
    events: &[CurrentEvent],
    mut next: usize,
    done: usize,
    weights: &[Real],
    acc: &mut Accumulator,
) -> usize {
    let Some(map) = ctx.surfaces else {
        return next;
    };
    let g_count = ctx.num_groups;
    let cg = map.num_coarse_groups;
    let incoming = map.num_surfaces * cg;
    while let Some(event) = events.get(next).filter(|e| e.after == done) {
        for (p, &w) in weights.iter().enumerate() {
            let psi = &acc.psi[p * g_count..(p + 1) * g_count];
            for (&v, &coarse) in psi.iter().zip(&map.group_map) {
                if let Some(out) = event.out {
                    acc.tally.currents[out * cg + coarse] += w * v;
                }
                if let Some(inc) = event.inc {
                    acc.tally.currents[incoming + inc * cg + coarse] += w * v;
                }
            }
        }
        next += 1;
    }
    next
}
