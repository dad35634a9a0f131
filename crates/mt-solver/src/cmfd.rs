//! Coarse mesh finite difference acceleration.
//!
//! A uniform mesh is laid over the domain and every region is assigned to the
//! mesh cell holding it. The sweep tallies partial currents through mesh cell
//! faces. After each sweep the fine flux is collapsed onto the mesh, a coarse
//! diffusion problem with a nonlinear current correction is solved, and the
//! fine flux and the incoming boundary flux are scaled by the coarse change.

use mt_core::{Point, Real};
use mt_geometry::{BoundaryType, BoundingBox, Side};
use mt_tracks::TrackSet;
use mt_xs::Material;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};
use crate::fsr::FsrTable;
use crate::options::CmfdOptions;
use crate::source::FixedSource;
use crate::sweep::SweepEngine;

const NUM_SIDES: usize = 4;

/// Uniform coarse mesh over the domain, cells numbered `iy * num_x + ix`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseMesh {
    num_x: usize,
    num_y: usize,
    bbox: BoundingBox,
    cell_width: Real,
    cell_height: Real,
}

impl CoarseMesh {
    pub fn new(bbox: BoundingBox, num_x: usize, num_y: usize) -> Self {
        let (num_x, num_y) = (num_x.max(1), num_y.max(1));
        Self {
            num_x,
            num_y,
            bbox,
            cell_width: bbox.width() / num_x as Real,
            cell_height: bbox.height() / num_y as Real,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.num_x * self.num_y
    }

    pub fn cell_xy(&self, cell: usize) -> (usize, usize) {
        (cell % self.num_x, cell / self.num_x)
    }

    /// Mesh cell holding `p`; points on the outer boundary are clamped inside.
    pub fn cell_at(&self, p: Point) -> usize {
        let index = |offset: Real, width: Real, count: usize| {
            let i = (offset / width).floor();
            if i <= 0.0 {
                0
            } else {
                (i as usize).min(count - 1)
            }
        };
        let ix = index(p.x - self.bbox.x_min, self.cell_width, self.num_x);
        let iy = index(p.y - self.bbox.y_min, self.cell_height, self.num_y);
        iy * self.num_x + ix
    }

    pub fn cell_box(&self, cell: usize) -> BoundingBox {
        let (ix, iy) = self.cell_xy(cell);
        let x_min = self.bbox.x_min + ix as Real * self.cell_width;
        let y_min = self.bbox.y_min + iy as Real * self.cell_height;
        BoundingBox {
            x_min,
            x_max: x_min + self.cell_width,
            y_min,
            y_max: y_min + self.cell_height,
        }
    }

    /// Neighbor across `side` inside the mesh.
    fn interior_neighbor(&self, cell: usize, side: Side) -> Option<usize> {
        let (ix, iy) = self.cell_xy(cell);
        let (ix, iy) = match side {
            Side::XMin => (ix.checked_sub(1)?, iy),
            Side::XMax => (Some(ix + 1).filter(|&i| i < self.num_x)?, iy),
            Side::YMin => (ix, iy.checked_sub(1)?),
            Side::YMax => (ix, Some(iy + 1).filter(|&i| i < self.num_y)?),
        };
        Some(iy * self.num_x + ix)
    }

    /// Neighbor across `side`, wrapping through periodic boundaries.
    pub fn neighbor(&self, cell: usize, side: Side, boundary: BoundaryType) -> Option<usize> {
        if let Some(next) = self.interior_neighbor(cell, side) {
            return Some(next);
        }
        if boundary != BoundaryType::Periodic {
            return None;
        }
        let (ix, iy) = self.cell_xy(cell);
        let (ix, iy) = match side {
            Side::XMin => (self.num_x - 1, iy),
            Side::XMax => (0, iy),
            Side::YMin => (ix, self.num_y - 1),
            Side::YMax => (ix, 0),
        };
        Some(iy * self.num_x + ix)
    }

    /// Length of a cell face on `side`.
    pub fn face_length(&self, side: Side) -> Real {
        if side.is_x() {
            self.cell_height
        } else {
            self.cell_width
        }
    }

    /// Cell width normal to `side`.
    pub fn normal_width(&self, side: Side) -> Real {
        if side.is_x() {
            self.cell_width
        } else {
            self.cell_height
        }
    }
}

/// Domain side closest to a point on the boundary.
fn nearest_side(bbox: &BoundingBox, p: Point) -> Side {
    let distances = [
        p.x - bbox.x_min,
        bbox.x_max - p.x,
        p.y - bbox.y_min,
        bbox.y_max - p.y,
    ];
    let mut best = Side::XMin;
    for side in Side::ALL {
        if distances[side.index()].abs() < distances[best.index()].abs() {
            best = side;
        }
    }
    best
}

fn surface(cell: usize, side: Side) -> usize {
    cell * NUM_SIDES + side.index()
}

/// A point on a track where angular flux crosses a mesh cell face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CurrentEvent {
    /// Segments traversed before the crossing.
    pub after: usize,
    /// Surface `cell * 4 + side` the flux leaves through.
    pub out: Option<usize>,
    /// Surface the flux enters through.
    pub inc: Option<usize>,
}

/// Per (track, direction) current events and the group collapse used by the sweep.
#[derive(Debug, Clone)]
pub(crate) struct SurfaceMap {
    pub events: Vec<CurrentEvent>,
    pub offsets: Vec<usize>,
    pub group_map: Vec<usize>,
    pub num_coarse_groups: usize,
    pub num_surfaces: usize,
}

impl SurfaceMap {
    pub fn slot_events(&self, slot: usize) -> &[CurrentEvent] {
        &self.events[self.offsets[slot]..self.offsets[slot + 1]]
    }

    /// Outgoing then incoming partial currents per surface and coarse group.
    pub fn tally_len(&self) -> usize {
        2 * self.num_surfaces * self.num_coarse_groups
    }
}

/// Outcome of one acceleration step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CmfdStep {
    /// Coarse-mesh multiplication factor (eigenvalue mode)
    pub k_eff: Option<Real>,
    pub coarse_iterations: usize,
    /// Largest coarse cell imbalance of the sweep, relative to the total source
    pub imbalance: Real,
    pub flux_updated: bool,
}

/// Coarse solution of one step: flux ratios per cell and coarse group.
#[derive(Debug, Clone)]
pub(crate) struct CoarseSolution {
    pub k_eff: Option<Real>,
    pub iterations: usize,
    pub ratios: Vec<Real>,
}

/// Cross sections and flux collapsed onto the mesh, indexed `cell * groups + group`.
#[derive(Debug, Clone)]
struct CoarseXs {
    volume: Vec<Real>,
    flux: Vec<Real>,
    sigma_t: Vec<Real>,
    diffusion: Vec<Real>,
    nu_sigma_f: Vec<Real>,
    chi: Vec<Real>,
    /// `[(cell * groups + from) * groups + to]`
    scatter: Vec<Real>,
    /// Volume-integrated fixed source
    fixed: Vec<Real>,
}

/// Coarse mesh accelerator bound to one set of tracks.
#[derive(Debug, Clone)]
pub struct Cmfd {
    mesh: CoarseMesh,
    boundaries: [BoundaryType; 4],
    group_map: Vec<usize>,
    num_coarse_groups: usize,
    region_cells: Vec<usize>,
    cell_volumes: Vec<Real>,
    /// Mesh cell entered first by each (track, direction) slot
    entry_cells: Vec<Option<usize>>,
    flux_update: bool,
    source_tolerance: Real,
    max_iterations: usize,
}

impl Cmfd {
    /// Map regions onto the mesh and record where every track crosses a face.
    ///
    /// Fails when a region spills over a mesh line or a mesh cell holds no region.
    pub(crate) fn new(
        options: &CmfdOptions,
        tracks: &TrackSet,
        fsr: &FsrTable,
        group_map: Vec<usize>,
    ) -> SolverResult<(Self, SurfaceMap)> {
        let bbox = *tracks.bounding_box();
        let mesh = CoarseMesh::new(bbox, options.mesh[0], options.mesh[1]);
        let region_cells: Vec<usize> = fsr.centroids().iter().map(|&c| mesh.cell_at(c)).collect();

        let mut cell_volumes = vec![0.0; mesh.num_cells()];
        for (r, &cell) in region_cells.iter().enumerate() {
            cell_volumes[cell] += fsr.volume(r);
        }
        if let Some(cell) = cell_volumes.iter().position(|&v| v <= 0.0) {
            return Err(SolverError::Configuration {
                what: format!("cmfd mesh cell {:?} holds no region", mesh.cell_xy(cell)),
            });
        }

        let tol = 1e-8 * mesh.cell_width.max(mesh.cell_height);
        let mut events = Vec::new();
        let mut offsets = vec![0];
        let mut entry_cells = Vec::with_capacity(2 * tracks.num_tracks());
        for track in tracks.tracks() {
            let segments = tracks.segments(track);
            let mut cells = Vec::with_capacity(segments.len());
            let mut s = 0.0;
            for seg in segments {
                let cell = region_cells[seg.region.idx()];
                let mid = track.start.advance(track.direction, s + 0.5 * seg.length);
                s += seg.length;
                let b = mesh.cell_box(cell);
                let inside = mid.x >= b.x_min - tol
                    && mid.x <= b.x_max + tol
                    && mid.y >= b.y_min - tol
                    && mid.y <= b.y_max + tol;
                if !inside {
                    return Err(SolverError::Configuration {
                        what: format!(
                            "cmfd mesh line cuts region {}; the mesh must follow region boundaries",
                            seg.region.idx()
                        ),
                    });
                }
                cells.push(cell);
            }

            let start_side = nearest_side(&bbox, track.start);
            let end_side = nearest_side(&bbox, track.end);
            push_direction(&mesh, &cells, start_side, end_side, &mut events)?;
            offsets.push(events.len());
            cells.reverse();
            push_direction(&mesh, &cells, end_side, start_side, &mut events)?;
            offsets.push(events.len());
            entry_cells.push(cells.last().copied());
            entry_cells.push(cells.first().copied());
        }

        let num_coarse_groups = group_map.iter().max().map_or(0, |&g| g + 1);
        debug!(
            cells = mesh.num_cells(),
            coarse_groups = num_coarse_groups,
            crossings = events.len(),
            "cmfd mesh ready"
        );
        let surfaces = SurfaceMap {
            events,
            offsets,
            group_map: group_map.clone(),
            num_coarse_groups,
            num_surfaces: mesh.num_cells() * NUM_SIDES,
        };
        let cmfd = Self {
            mesh,
            boundaries: Side::ALL.map(|side| tracks.boundary_type(side)),
            group_map,
            num_coarse_groups,
            region_cells,
            cell_volumes,
            entry_cells,
            flux_update: options.flux_update,
            source_tolerance: options.source_tolerance,
            max_iterations: options.max_iterations,
        };
        Ok((cmfd, surfaces))
    }

    /// Mesh cell of every region.
    pub fn region_cells(&self) -> &[usize] {
        &self.region_cells
    }

    pub fn flux_update(&self) -> bool {
        self.flux_update
    }

    /// Largest coarse-cell residual of `(Σt·φ - Q)·V + out - in`, relative to the
    /// total source. The sweep conserves neutrons per cell, so this is round-off
    /// unless negative flux was clamped.
    pub(crate) fn neutron_balance(
        &self,
        fsr: &FsrTable,
        sigma_t: &[Real],
        flux: &[Real],
        currents: &[Real],
    ) -> Real {
        let g_count = self.group_map.len();
        let cg = self.num_coarse_groups;
        let mut residual = vec![0.0; self.mesh.num_cells() * cg];
        let mut total_source = 0.0;
        for (r, &cell) in self.region_cells.iter().enumerate() {
            let volume = fsr.volume(r);
            for (g, &coarse) in self.group_map.iter().enumerate() {
                let i = r * g_count + g;
                let q = fsr.source()[i];
                residual[cell * cg + coarse] += (sigma_t[i] * flux[i] - q) * volume;
                total_source += q.abs() * volume;
            }
        }

        let incoming = self.mesh.num_cells() * NUM_SIDES * cg;
        for (i, res) in residual.iter_mut().enumerate() {
            let (cell, group) = (i / cg, i % cg);
            for side in Side::ALL {
                let s = surface(cell, side) * cg + group;
                *res += currents[s] - currents[incoming + s];
            }
        }

        let worst = residual.iter().fold(0.0, |m: Real, r| m.max(r.abs()));
        if total_source > 0.0 {
            worst / total_source
        } else {
            worst
        }
    }

    /// Solve the coarse problem for the current fine flux.
    ///
    /// `k` selects the eigenvalue problem; without it the fixed source drives
    /// the coarse problem. Returns `None` when the coarse solve breaks down.
    pub(crate) fn accelerate(
        &self,
        fsr: &FsrTable,
        materials: &[Material],
        fixed: &FixedSource,
        currents: &[Real],
        flux: &[Real],
        k: Option<Real>,
    ) -> Option<CoarseSolution> {
        let xs = self.collapse(fsr, materials, fixed, flux);
        let (a, m) = self.assemble(&xs, currents);
        let old = DVector::from_column_slice(&xs.flux);

        let (mut coarse, k_eff, iterations) = match k {
            Some(k) => {
                let (phi, k, iterations) = self.power_iteration(a, &m, old.clone(), k)?;
                (phi, Some(k), iterations)
            }
            None => {
                let phi = (a - &m).lu().solve(&DVector::from_column_slice(&xs.fixed))?;
                (phi, None, 1)
            }
        };

        if k.is_some() {
            // Match the fission production of the fine flux.
            let production = |phi: &DVector<Real>| -> Real {
                phi.iter()
                    .enumerate()
                    .map(|(i, p)| xs.nu_sigma_f[i] * p * xs.volume[i / self.num_coarse_groups])
                    .sum()
            };
            let (fine, solved) = (production(&old), production(&coarse));
            if fine > 0.0 && solved > 0.0 {
                coarse *= fine / solved;
            }
        }

        let ratios: Vec<Real> = old
            .iter()
            .zip(coarse.iter())
            .map(|(&o, &n)| if o > 0.0 { n / o } else { 1.0 })
            .collect();
        if let Some(bad) = ratios.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            warn!(ratio = bad, "coarse mesh flux is not positive, skipping acceleration");
            return None;
        }
        Some(CoarseSolution {
            k_eff,
            iterations,
            ratios,
        })
    }

    /// Scale the fine flux (and its moments) of every region by its cell's ratio.
    pub(crate) fn prolongate(&self, ratios: &[Real], flux: &mut [Real], moments: &mut [[Real; 2]]) {
        let g_count = self.group_map.len();
        let cg = self.num_coarse_groups;
        for (r, &cell) in self.region_cells.iter().enumerate() {
            for (g, &coarse) in self.group_map.iter().enumerate() {
                let ratio = ratios[cell * cg + coarse];
                let i = r * g_count + g;
                flux[i] *= ratio;
                if let Some(m) = moments.get_mut(i) {
                    m[0] *= ratio;
                    m[1] *= ratio;
                }
            }
        }
    }

    /// Scale incoming boundary flux by the ratio of the cell it enters.
    pub(crate) fn rescale_boundary(&self, engine: &mut SweepEngine, ratios: &[Real]) {
        let cg = self.num_coarse_groups;
        engine.scale_incoming(|slot, group| match self.entry_cells[slot] {
            Some(cell) => ratios[cell * cg + self.group_map[group]],
            None => 1.0,
        });
    }

    fn collapse(
        &self,
        fsr: &FsrTable,
        materials: &[Material],
        fixed: &FixedSource,
        flux: &[Real],
    ) -> CoarseXs {
        let g_count = self.group_map.len();
        let cg = self.num_coarse_groups;
        let n = self.mesh.num_cells() * cg;
        let mut xs = CoarseXs {
            volume: self.cell_volumes.clone(),
            flux: vec![0.0; n],
            sigma_t: vec![0.0; n],
            diffusion: vec![0.0; n],
            nu_sigma_f: vec![0.0; n],
            chi: vec![0.0; n],
            scatter: vec![0.0; n * cg],
            fixed: vec![0.0; n],
        };

        for (r, &cell) in self.region_cells.iter().enumerate() {
            for (g, &coarse) in self.group_map.iter().enumerate() {
                xs.flux[cell * cg + coarse] += flux[r * g_count + g] * fsr.volume(r);
            }
        }

        // Flux weights, or plain volume where a cell group carries no flux.
        let mut weight_sum = vec![0.0; n];
        let mut production = vec![0.0; self.mesh.num_cells()];
        for (r, &cell) in self.region_cells.iter().enumerate() {
            let volume = fsr.volume(r);
            let mat = &materials[fsr.material(r)];
            let phi = &flux[r * g_count..(r + 1) * g_count];
            let region_production: Real = phi
                .iter()
                .zip(&mat.nu_sigma_f)
                .map(|(p, nsf)| p * nsf * volume)
                .sum();
            production[cell] += region_production;

            for (g, &coarse) in self.group_map.iter().enumerate() {
                let i = cell * cg + coarse;
                let w = if xs.flux[i] > 0.0 {
                    phi[g] * volume
                } else {
                    volume
                };
                weight_sum[i] += w;
                xs.sigma_t[i] += w * mat.sigma_t[g];
                xs.diffusion[i] += w / (3.0 * mat.sigma_t[g]);
                xs.nu_sigma_f[i] += w * mat.nu_sigma_f[g];
                xs.chi[i] += mat.chi[g] * region_production;
                xs.fixed[i] += fixed.strength()[r * g_count + g] * volume;
                for (to, &coarse_to) in self.group_map.iter().enumerate() {
                    xs.scatter[i * cg + coarse_to] += w * mat.scatter(g, to);
                }
            }
        }

        for i in 0..n {
            let cell = i / cg;
            let w = weight_sum[i];
            if w != 0.0 {
                xs.sigma_t[i] /= w;
                xs.diffusion[i] /= w;
                xs.nu_sigma_f[i] /= w;
                for s in &mut xs.scatter[i * cg..(i + 1) * cg] {
                    *s /= w;
                }
            }
            xs.chi[i] = if production[cell] > 0.0 {
                xs.chi[i] / production[cell]
            } else {
                0.0
            };
            xs.flux[i] /= self.cell_volumes[cell];
        }
        xs
    }

    /// Loss matrix A and production matrix M of the coarse problem.
    fn assemble(&self, xs: &CoarseXs, currents: &[Real]) -> (DMatrix<Real>, DMatrix<Real>) {
        let cg = self.num_coarse_groups;
        let n = self.mesh.num_cells() * cg;
        let mut a = DMatrix::zeros(n, n);
        let mut m = DMatrix::zeros(n, n);
        for i in 0..n {
            let (cell, group) = (i / cg, i % cg);
            let volume = xs.volume[cell];
            a[(i, i)] += xs.sigma_t[i] * volume;
            for from in 0..cg {
                let j = cell * cg + from;
                a[(i, j)] -= xs.scatter[j * cg + group] * volume;
                m[(i, j)] += xs.chi[i] * xs.nu_sigma_f[j] * volume;
            }
            for side in Side::ALL {
                let (diagonal, coupling) = self.face_coupling(xs, currents, cell, group, side);
                a[(i, i)] += diagonal;
                if let Some((next, value)) = coupling {
                    a[(i, next * cg + group)] += value;
                }
            }
        }
        (a, m)
    }

    /// Leakage through one face as `diagonal·φ_cell + value·φ_next`.
    ///
    /// The net outward current J fixes the correction D̂ in
    /// `J = D̃(φ_cell - φ_next) + D̂(φ_cell + φ_next)`; where |D̂| exceeds D̃
    /// both are reset so the current is carried by the upwind flux alone.
    fn face_coupling(
        &self,
        xs: &CoarseXs,
        currents: &[Real],
        cell: usize,
        group: usize,
        side: Side,
    ) -> (Real, Option<(usize, Real)>) {
        let cg = self.num_coarse_groups;
        let i = cell * cg + group;
        let s = surface(cell, side) * cg + group;
        let incoming = self.mesh.num_cells() * NUM_SIDES * cg;
        let area = self.mesh.face_length(side);
        let h = self.mesh.normal_width(side);
        let net = (currents[s] - currents[incoming + s]) / area;
        let (phi, d) = (xs.flux[i], xs.diffusion[i]);
        let boundary = self.boundaries[side.index()];

        match self.mesh.neighbor(cell, side, boundary) {
            Some(next) => {
                let j = next * cg + group;
                let (phi_next, d_next) = (xs.flux[j], xs.diffusion[j]);
                let mut d_tilde = 2.0 * d * d_next / (h * (d + d_next));
                let mut d_hat = if phi > 0.0 && phi_next > 0.0 {
                    (net - d_tilde * (phi - phi_next)) / (phi + phi_next)
                } else {
                    0.0
                };
                if d_hat.abs() > d_tilde {
                    if net >= 0.0 {
                        d_tilde = net / (2.0 * phi);
                        d_hat = d_tilde;
                    } else {
                        d_tilde = -net / (2.0 * phi_next);
                        d_hat = -d_tilde;
                    }
                }
                (area * (d_tilde + d_hat), Some((next, area * (d_hat - d_tilde))))
            }
            None => match boundary {
                BoundaryType::Vacuum => {
                    let d_tilde = 2.0 * d / (h + 4.0 * d);
                    let d_hat = if phi > 0.0 {
                        (net - d_tilde * phi) / phi
                    } else {
                        0.0
                    };
                    (area * (d_tilde + d_hat), None)
                }
                _ => (0.0, None),
            },
        }
    }

    /// Power iteration on `A φ = M φ / k` starting from the collapsed flux.
    fn power_iteration(
        &self,
        a: DMatrix<Real>,
        m: &DMatrix<Real>,
        mut phi: DVector<Real>,
        mut k: Real,
    ) -> Option<(DVector<Real>, Real, usize)> {
        let lu = a.lu();
        let mut source = m * &phi;
        let mut total = source.sum();
        if !(total.is_finite() && total > 0.0) {
            return None;
        }

        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            let next = lu.solve(&(&source / k))?;
            let next_source = m * &next;
            let next_total = next_source.sum();
            if !(next_total.is_finite() && next_total > 0.0) {
                return None;
            }
            k *= next_total / total;
            let shape = &next_source / next_total;
            let change = (&shape - &source / total).norm() / shape.norm();

            phi = next;
            source = next_source;
            total = next_total;
            if change < self.source_tolerance {
                break;
            }
        }
        Some((phi, k, iterations))
    }
}

/// Current events along one traversal direction over `cells` in path order.
fn push_direction(
    mesh: &CoarseMesh,
    cells: &[usize],
    entry: Side,
    exit: Side,
    events: &mut Vec<CurrentEvent>,
) -> SolverResult<()> {
    let (Some(&first), Some(&last)) = (cells.first(), cells.last()) else {
        return Ok(());
    };
    events.push(CurrentEvent {
        after: 0,
        out: None,
        inc: Some(surface(first, entry)),
    });
    for (k, pair) in cells.windows(2).enumerate() {
        if pair[0] != pair[1] {
            push_crossing(mesh, k + 1, pair[0], pair[1], events)?;
        }
    }
    events.push(CurrentEvent {
        after: cells.len(),
        out: Some(surface(last, exit)),
        inc: None,
    });
    Ok(())
}

/// Crossing between adjacent cells; a corner crossing passes through the
/// x-neighbor first.
fn push_crossing(
    mesh: &CoarseMesh,
    after: usize,
    from: usize,
    to: usize,
    events: &mut Vec<CurrentEvent>,
) -> SolverResult<()> {
    let (fx, fy) = mesh.cell_xy(from);
    let (tx, ty) = mesh.cell_xy(to);
    let x_side = match tx as isize - fx as isize {
        0 => None,
        1 => Some(Side::XMax),
        -1 => Some(Side::XMin),
        _ => return Err(skipped_cell(from, to)),
    };
    let y_side = match ty as isize - fy as isize {
        0 => None,
        1 => Some(Side::YMax),
        -1 => Some(Side::YMin),
        _ => return Err(skipped_cell(from, to)),
    };
    let mut step = |a: usize, b: usize, side: Side| {
        events.push(CurrentEvent {
            after,
            out: Some(surface(a, side)),
            inc: Some(surface(b, side.opposite())),
        })
    };
    match (x_side, y_side) {
        (Some(side), None) | (None, Some(side)) => step(from, to, side),
        (Some(sx), Some(sy)) => {
            let corner = fy * mesh.num_x + tx;
            step(from, corner, sx);
            step(corner, to, sy);
        }
        (None, None) => {}
    }
    Ok(())
}

fn skipped_cell(from: usize, to: usize) -> SolverError {
    SolverError::InvalidState {
        what: format!("track jumps from cmfd cell {from} to non-adjacent cell {to}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_mesh(n: usize) -> CoarseMesh {
        let bbox = BoundingBox {
            x_min: 0.0,
            x_max: n as Real,
            y_min: 0.0,
            y_max: n as Real,
        };
        CoarseMesh::new(bbox, n, n)
    }

    #[test]
    fn cell_lookup_clamps_to_the_mesh() {
        let mesh = unit_mesh(3);
        assert_eq!(mesh.cell_at(Point::new(0.5, 0.5)), 0);
        assert_eq!(mesh.cell_at(Point::new(2.5, 1.5)), 5);
        assert_eq!(mesh.cell_at(Point::new(3.0, 3.0)), 8);
        assert_eq!(mesh.cell_at(Point::new(-1e-12, 1.0)), 3);
        assert_eq!(mesh.cell_box(4).x_min, 1.0);
        assert_eq!(mesh.cell_box(4).y_max, 2.0);
    }

    #[test]
    fn neighbors_wrap_only_through_periodic_sides() {
        let mesh = unit_mesh(3);
        assert_eq!(mesh.neighbor(4, Side::XMax, BoundaryType::Vacuum), Some(5));
        assert_eq!(mesh.neighbor(4, Side::YMin, BoundaryType::Vacuum), Some(1));
        assert_eq!(mesh.neighbor(2, Side::XMax, BoundaryType::Reflective), None);
        assert_eq!(mesh.neighbor(2, Side::XMax, BoundaryType::Periodic), Some(0));
        assert_eq!(mesh.neighbor(1, Side::YMin, BoundaryType::Periodic), Some(7));
    }

    #[test]
    fn boundary_points_map_to_their_side() {
        let mesh = unit_mesh(2);
        let bbox = mesh.bbox;
        assert_eq!(nearest_side(&bbox, Point::new(0.0, 0.7)), Side::XMin);
        assert_eq!(nearest_side(&bbox, Point::new(2.0, 1.3)), Side::XMax);
        assert_eq!(nearest_side(&bbox, Point::new(1.1, 0.0)), Side::YMin);
        assert_eq!(nearest_side(&bbox, Point::new(0.4, 2.0)), Side::YMax);
    }

    #[test]
    fn corner_crossing_passes_through_the_x_neighbor() {
        let mesh = unit_mesh(2);
        let mut events = Vec::new();
        push_crossing(&mesh, 3, 0, 3, &mut events).unwrap();
        assert_eq!(
            events,
            vec![
                CurrentEvent {
                    after: 3,
                    out: Some(surface(0, Side::XMax)),
                    inc: Some(surface(1, Side::XMin)),
                },
                CurrentEvent {
                    after: 3,
                    out: Some(surface(1, Side::YMax)),
                    inc: Some(surface(3, Side::YMin)),
                },
            ]
        );
        assert!(push_crossing(&unit_mesh(3), 1, 0, 2, &mut events).is_err());
    }

    #[test]
    fn direction_events_bracket_the_crossings() {
        let mesh = unit_mesh(2);
        let mut events = Vec::new();
        push_direction(&mesh, &[0, 0, 1], Side::XMin, Side::XMax, &mut events).unwrap();
        let afters: Vec<usize> = events.iter().map(|e| e.after).collect();
        assert_eq!(afters, vec![0, 2, 3]);
        assert_eq!(events[0].inc, Some(surface(0, Side::XMin)));
        assert_eq!(events[2].out, Some(surface(1, Side::XMax)));
    }
}
