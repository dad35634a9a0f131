//! Per-region data for flat source regions.

use mt_core::{Point, Real, RegionId};
use mt_tracks::TrackSet;
use nalgebra::Matrix2;
use tracing::warn;

/// One region's view of the table.
#[derive(Debug, Clone, Copy)]
pub struct FsrRow<'a> {
    pub volume: Real,
    /// Index into the solver's resolved materials.
    pub material: usize,
    pub centroid: Point,
    pub scalar_flux: &'a [Real],
    pub source: &'a [Real],
}

pub(crate) struct SourceView<'a> {
    pub materials: &'a [usize],
    pub inverses: &'a [Option<Matrix2<Real>>],
    pub flux: &'a [Real],
    pub flux_moments: &'a [[Real; 2]],
    pub source: &'a mut [Real],
    pub source_moments: &'a mut [[Real; 2]],
}

/// Region volumes, materials, fluxes and sources, indexed by region then group.
#[derive(Debug, Clone)]
pub struct FsrTable {
    num_groups: usize,
    materials: Vec<usize>,
    volumes: Vec<Real>,
    centroids: Vec<Point>,
    moments: Vec<[Real; 3]>,
    moment_inverse: Vec<Option<Matrix2<Real>>>,
    scalar_flux: Vec<Real>,
    source: Vec<Real>,
    flux_moments: Vec<[Real; 2]>,
    source_moments: Vec<[Real; 2]>,
}

impl FsrTable {
    /// Build from generated tracks. `materials[r]` indexes the solver's material list.
    ///
    /// Moment matrices are inverted once here; with `linear` set, a singular
    /// matrix is reported and that region keeps a flat source.
    pub fn new(tracks: &TrackSet, materials: Vec<usize>, num_groups: usize, linear: bool) -> Self {
        let n = tracks.num_regions();
        debug_assert_eq!(materials.len(), n);
        let moment_inverse = tracks
            .moments()
            .iter()
            .enumerate()
            .map(|(r, &[xx, xy, yy])| {
                let m = Matrix2::new(xx, xy, xy, yy);
                let scale = (xx + yy).max(Real::MIN_POSITIVE);
                let inverse = if m.determinant().abs() > 1e-10 * scale * scale {
                    m.try_inverse()
                } else {
                    None
                };
                if linear && inverse.is_none() {
                    warn!(region = r, "degenerate moment matrix, using a flat source");
                }
                inverse
            })
            .collect();
        Self {
            num_groups,
            materials,
            volumes: tracks.volumes().to_vec(),
            centroids: tracks.centroids().to_vec(),
            moments: tracks.moments().to_vec(),
            moment_inverse,
            scalar_flux: vec![0.0; n * num_groups],
            source: vec![0.0; n * num_groups],
            flux_moments: vec![[0.0; 2]; n * num_groups],
            source_moments: vec![[0.0; 2]; n * num_groups],
        }
    }

    pub fn num_regions(&self) -> usize {
        self.volumes.len()
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn index(&self, region: usize, group: usize) -> usize {
        region * self.num_groups + group
    }

    pub fn row(&self, region: RegionId) -> FsrRow<'_> {
        let r = region.idx();
        let span = r * self.num_groups..(r + 1) * self.num_groups;
        FsrRow {
            volume: self.volumes[r],
            material: self.materials[r],
            centroid: self.centroids[r],
            scalar_flux: &self.scalar_flux[span.clone()],
            source: &self.source[span],
        }
    }

    pub fn volume(&self, region: usize) -> Real {
        self.volumes[region]
    }

    pub fn volumes(&self) -> &[Real] {
        &self.volumes
    }

    pub fn material(&self, region: usize) -> usize {
        self.materials[region]
    }

    pub fn materials(&self) -> &[usize] {
        &self.materials
    }

    pub fn centroids(&self) -> &[Point] {
        &self.centroids
    }

    /// Second central moments per unit volume as `[xx, xy, yy]`.
    pub fn moment_matrix(&self, region: usize) -> [Real; 3] {
        self.moments[region]
    }

    /// True when the region's moment matrix could be inverted.
    pub fn has_linear_source(&self, region: usize) -> bool {
        self.moment_inverse[region].is_some()
    }

    pub fn flux(&self, region: usize, group: usize) -> Real {
        self.scalar_flux[self.index(region, group)]
    }

    pub fn scalar_flux(&self) -> &[Real] {
        &self.scalar_flux
    }

    pub fn scalar_flux_mut(&mut self) -> &mut [Real] {
        &mut self.scalar_flux
    }

    /// Total isotropic emission density per region and group.
    pub fn source(&self) -> &[Real] {
        &self.source
    }

    /// Flux first moments about each region centroid.
    pub fn flux_moments(&self) -> &[[Real; 2]] {
        &self.flux_moments
    }

    pub(crate) fn flux_moments_mut(&mut self) -> &mut [[Real; 2]] {
        &mut self.flux_moments
    }

    /// Linear source gradient per region and group.
    pub fn source_moments(&self) -> &[[Real; 2]] {
        &self.source_moments
    }

    /// Disjoint borrows for the source update: flux in, source out.
    pub(crate) fn source_view(&mut self) -> SourceView<'_> {
        SourceView {
            materials: &self.materials,
            inverses: &self.moment_inverse,
            flux: &self.scalar_flux,
            flux_moments: &self.flux_moments,
            source: &mut self.source,
            source_moments: &mut self.source_moments,
        }
    }

    /// Zero flux, source and all moments.
    pub fn reset(&mut self) {
        self.scalar_flux.fill(0.0);
        self.source.fill(0.0);
        self.flux_moments.fill([0.0; 2]);
        self.source_moments.fill([0.0; 2]);
    }
}
