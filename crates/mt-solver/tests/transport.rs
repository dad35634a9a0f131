//! End-to-end transport solves against analytic and conservation checks.

use mt_core::{Real, RegionId};
use mt_geometry::{BoundaryType, Geometry, LatticeBuilder, LatticeGeometry, PinCell};
use mt_solver::{
    CmfdOptions, MocSolver, ResidualNorm, SolveMode, SolverError, SolverOptions, SolverState,
    SourceMode,
};
use mt_xs::{Material, MaterialLibrary};

fn homogeneous_lattice(n: usize, pitch: Real, boundary: BoundaryType) -> LatticeGeometry {
    let mut b = LatticeBuilder::new(n, n, pitch, pitch);
    let m = b.add_material("medium");
    let pin = b.add_pin_cell(PinCell::homogeneous("cell", m, 1));
    b.fill(pin).set_all_boundaries(boundary);
    b.build().unwrap()
}

fn one_group(sigma_t: Real, sigma_s: Real) -> Material {
    Material::new("medium", 1)
        .with_total(vec![sigma_t])
        .with_scatter(vec![sigma_s])
}

fn options() -> SolverOptions {
    SolverOptions {
        num_azim: 8,
        track_spacing: 0.1,
        num_polar: 2,
        tolerance: 1e-8,
        max_iterations: 2000,
        ..Default::default()
    }
}

fn all_regions(g: &impl Geometry) -> impl Iterator<Item = RegionId> {
    (0..g.num_regions()).map(RegionId::from_usize)
}

#[test]
fn infinite_medium_fixed_source_gives_q_over_sigma_a() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();

    assert!(sol.converged);
    assert!(sol.k_eff.is_none());
    assert!(sol.leakage.abs() < 1e-12);
    for r in all_regions(&g) {
        let phi = sol.flux(r, 0);
        assert!((phi - 2.0).abs() < 1e-5, "region {r}: {phi}");
    }
}

#[test]
fn periodic_medium_matches_reflective() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Periodic);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    for r in all_regions(&g) {
        assert!((sol.flux(r, 0) - 2.0).abs() < 1e-5);
    }
}

#[test]
fn infinite_medium_eigenvalue() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let fuel = Material::new("medium", 1)
        .with_total(vec![1.0])
        .with_scatter(vec![0.6])
        .with_fission(vec![0.5], vec![1.0]);
    let lib = MaterialLibrary::from_materials([fuel]).unwrap();
    let opts = SolverOptions {
        mode: SolveMode::Eigenvalue,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let sol = solver.solve().unwrap();

    assert!(sol.converged);
    let k = sol.k_eff.unwrap();
    assert!((k - 1.25).abs() < 1e-5, "k = {k}");

    // Flux is normalized to unit fission production.
    let volume = solver.fsr_table().unwrap().volume(0);
    let production = volume * 0.5 * sol.flux(RegionId::from_index(0), 0);
    assert!((production - 1.0).abs() < 1e-9);
}

#[test]
fn two_group_eigenvalue_with_downscatter() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let fuel = Material::new("medium", 2)
        .with_total(vec![1.0, 2.0])
        .with_scatter(vec![0.7, 0.2, 0.0, 1.5])
        .with_fission(vec![0.01, 0.8], vec![1.0, 0.0]);
    let lib = MaterialLibrary::from_materials([fuel]).unwrap();
    let opts = SolverOptions {
        mode: SolveMode::Eigenvalue,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let sol = solver.solve().unwrap();

    let k = sol.k_eff.unwrap();
    assert!((k - 1.1).abs() < 1e-5, "k = {k}");
    let r = RegionId::from_index(0);
    let ratio = sol.flux(r, 1) / sol.flux(r, 0);
    assert!((ratio - 0.4).abs() < 1e-5, "thermal/fast = {ratio}");

    let rates = solver.fission_rates().unwrap();
    assert_eq!(rates.len(), 1);
    assert!(rates[0] > 0.0);
}

#[test]
fn solving_twice_gives_identical_flux() {
    let g = homogeneous_lattice(3, 1.0, BoundaryType::Vacuum);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.7)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    solver.set_fixed_source(RegionId::from_index(4), 0, 1.0).unwrap();
    let first = solver.solve().unwrap();
    let second = solver.solve().unwrap();
    assert_eq!(first.scalar_flux, second.scalar_flux);
    assert_eq!(first.iterations, second.iterations);
}

/// Pure absorber with vacuum sides and an optional unit source in the center cell.
fn absorbing_box(source: bool) -> (LatticeGeometry, mt_solver::Solution, Vec<Real>) {
    let g = homogeneous_lattice(5, 1.0, BoundaryType::Vacuum);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.0)]).unwrap();
    let opts = SolverOptions {
        num_azim: 16,
        track_spacing: 0.05,
        num_polar: 4,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    if source {
        let center = g.cell_regions(2, 2).start;
        solver
            .set_fixed_source(RegionId::from_usize(center), 0, 1.0)
            .unwrap();
    }
    let sol = solver.solve().unwrap();
    let volumes = solver.fsr_table().unwrap().volumes().to_vec();
    (g, sol, volumes)
}

#[test]
fn absorbing_box_flux_falls_away_from_source() {
    let (g, sol, _) = absorbing_box(true);
    assert!(sol.converged);
    let cell = |ix, iy| sol.flux(RegionId::from_usize(g.cell_regions(ix, iy).start), 0);
    assert!(cell(2, 2) > cell(3, 2));
    assert!(cell(3, 2) > cell(4, 2));
    assert!(cell(3, 3) > cell(4, 4));
    // Symmetric about the center cell.
    assert!((cell(1, 2) - cell(3, 2)).abs() / cell(3, 2) < 0.02);
    assert!((cell(2, 1) - cell(2, 3)).abs() / cell(2, 3) < 0.02);
    assert!(sol.scalar_flux.iter().all(|&v| v > 0.0));
}

#[test]
fn absorbing_box_balances_source_against_absorption_and_leakage() {
    let (g, sol, volumes) = absorbing_box(true);
    // Σa = Σt = 1.
    let absorption: Real = volumes.iter().zip(&sol.scalar_flux).map(|(v, p)| v * p).sum();
    let source = volumes[g.cell_regions(2, 2).start];
    assert!(sol.leakage > 0.0);
    let imbalance = (source - absorption - sol.leakage).abs() / source;
    assert!(imbalance < 1e-6, "imbalance {imbalance}");
}

#[test]
fn no_source_gives_zero_flux() {
    let (_, sol, _) = absorbing_box(false);
    assert!(sol.converged);
    assert!(sol.scalar_flux.iter().all(|&v| v == 0.0));
    assert_eq!(sol.leakage, 0.0);
}

#[test]
fn scattering_box_balances_with_leakage() {
    let g = homogeneous_lattice(3, 1.0, BoundaryType::Vacuum);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.8)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);

    let fsr = solver.fsr_table().unwrap();
    let total_volume: Real = fsr.volumes().iter().sum();
    let absorption: Real = fsr
        .volumes()
        .iter()
        .zip(&sol.scalar_flux)
        .map(|(v, phi)| 0.2 * v * phi)
        .sum();
    let imbalance = (total_volume - absorption - sol.leakage).abs() / total_volume;
    assert!(imbalance < 1e-5, "imbalance {imbalance}");
}

fn pin_geometry(ring_sectors: u32, outer_sectors: u32) -> LatticeGeometry {
    let mut b = LatticeBuilder::new(1, 1, 1.26, 1.26);
    let fuel = b.add_material("fuel");
    let water = b.add_material("water");
    let pin = b.add_pin_cell(
        PinCell::new("pin")
            .ring(0.4, fuel, ring_sectors)
            .outer(water, outer_sectors),
    );
    b.fill(pin).set_all_boundaries(BoundaryType::Reflective);
    b.build().unwrap()
}

fn pin_library() -> MaterialLibrary {
    MaterialLibrary::from_materials([
        Material::new("fuel", 1)
            .with_total(vec![0.5])
            .with_scatter(vec![0.3]),
        Material::new("water", 1)
            .with_total(vec![1.2])
            .with_scatter(vec![1.15]),
    ])
    .unwrap()
}

/// Volume-averaged (fuel, water) flux and the solver's region/segment counts.
fn solve_pin(ring_sectors: u32, outer_sectors: u32) -> ((Real, Real), usize, usize) {
    let g = pin_geometry(ring_sectors, outer_sectors);
    let lib = pin_library();
    let opts = SolverOptions {
        num_azim: 16,
        track_spacing: 0.03,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let fuel_regions = g.zone_regions(0, 0, 0);
    solver
        .set_fixed_source_in(fuel_regions.clone().map(RegionId::from_usize), 0, 1.0)
        .unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);

    let fsr = solver.fsr_table().unwrap();
    let average = |regions: std::ops::Range<usize>| {
        let (num, den) = regions.fold((0.0, 0.0), |(n, d), r| {
            (n + fsr.volume(r) * fsr.flux(r, 0), d + fsr.volume(r))
        });
        num / den
    };
    let fuel = average(fuel_regions);
    let water = average(g.zone_regions(0, 0, 1));
    (
        (fuel, water),
        solver.num_regions(),
        solver.num_segments(),
    )
}

#[test]
fn sector_refinement_preserves_zone_averages() {
    let ((fuel1, water1), regions1, segments1) = solve_pin(1, 1);
    let ((fuel4, water4), regions4, segments4) = solve_pin(4, 8);
    assert_eq!(regions1, 2);
    assert_eq!(regions4, 12);
    assert!(segments4 > segments1);
    assert!((fuel1 - fuel4).abs() / fuel1 < 0.03, "{fuel1} vs {fuel4}");
    assert!((water1 - water4).abs() / water1 < 0.03, "{water1} vs {water4}");
    assert!(fuel1 > water1);
}

#[test]
fn iteration_cap_returns_unconverged_solution() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.9)]).unwrap();
    let opts = SolverOptions {
        max_iterations: 3,
        tolerance: 1e-14,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(!sol.converged);
    assert_eq!(sol.iterations, 3);
    assert!(sol.scalar_flux.iter().all(|v| v.is_finite()));
    assert_eq!(solver.state(), SolverState::MaxItersReached);
}

#[test]
fn consecutive_checks_and_max_norm_still_converge() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let opts = SolverOptions {
        consecutive_converged: 3,
        residual_norm: ResidualNorm::MaxRelative,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    assert_eq!(solver.state(), SolverState::Converged);
}

#[test]
fn divergence_limit_reports_last_finite_state() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let opts = SolverOptions {
        divergence_limit: 1.5,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    solver.set_fixed_source(RegionId::from_index(0), 0, 1.0).unwrap();
    match solver.solve() {
        Err(SolverError::NumericalDivergence {
            iteration,
            last_finite,
            ..
        }) => {
            assert!(iteration > 1);
            assert_eq!(last_finite.iterations, iteration - 1);
            assert!(last_finite.scalar_flux.iter().all(|&v| v <= 1.5));
        }
        other => panic!("expected divergence, got {other:?}"),
    }
}

#[test]
fn linear_source_reproduces_uniform_solution() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let opts = SolverOptions {
        source_mode: SourceMode::Linear,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    for r in all_regions(&g) {
        assert!((sol.flux(r, 0) - 2.0).abs() < 1e-5);
    }
}

#[test]
fn linear_fixed_source_with_negative_flux_allowed() {
    let mut b = LatticeBuilder::new(3, 3, 1.26, 1.26);
    let water = b.add_material("water");
    let source = b.add_material("source");
    let plain = b.add_pin_cell(PinCell::homogeneous("water", water, 4));
    let hot = b.add_pin_cell(PinCell::homogeneous("source", source, 4));
    b.fill(plain).set_cell(1, 1, hot);
    let g = b.build().unwrap();

    let groups = 2;
    let water_xs = Material::new("water", groups)
        .with_total(vec![0.6, 1.5])
        .with_scatter(vec![0.4, 0.15, 0.0, 1.4]);
    let source_xs = Material::new("source", groups)
        .with_total(vec![0.6, 1.5])
        .with_scatter(vec![0.4, 0.15, 0.0, 1.4]);
    let lib = MaterialLibrary::from_materials([water_xs, source_xs]).unwrap();

    let opts = SolverOptions {
        source_mode: SourceMode::Linear,
        allow_negative_flux: true,
        num_azim: 8,
        track_spacing: 0.1,
        num_polar: 2,
        tolerance: 1e-6,
        ..Default::default()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let hot_regions = g.cell_regions(1, 1);
    for group in 0..groups {
        solver
            .set_fixed_source_in(hot_regions.clone().map(RegionId::from_usize), group, 1.0)
            .unwrap();
        solver
            .set_fixed_source_moments_in(
                hot_regions.clone().map(RegionId::from_usize),
                group,
                0.01,
                -0.02,
            )
            .unwrap();
    }
    let fixed = solver.fixed_source();
    assert!(
        hot_regions
            .clone()
            .all(|r| fixed.moments()[r * groups + 1] == [0.01, -0.02])
    );
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    assert!(sol.scalar_flux.iter().all(|v| v.is_finite()));
    let center = RegionId::from_usize(hot_regions.start);
    let corner = RegionId::from_usize(g.cell_regions(0, 0).start);
    assert!(sol.flux(center, 0) > sol.flux(corner, 0));
    assert!(sol.leakage > 0.0);
}

#[test]
fn linear_source_gradient_carries_into_flux_moments() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(50.0, 0.0)]).unwrap();
    let opts = SolverOptions {
        source_mode: SourceMode::Linear,
        num_azim: 32,
        track_spacing: 0.005,
        num_polar: 6,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let r = RegionId::from_index(0);
    solver.set_fixed_source(r, 0, 1.0).unwrap();
    solver.set_fixed_source_moments(r, 0, 0.02, -0.01).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);

    // Without scattering the flux moments are the source moments over Σt.
    let [mx, my] = solver.fsr_table().unwrap().flux_moments()[0];
    assert!((mx - 4e-4).abs() < 0.01 * 4e-4, "mx = {mx}");
    assert!((my + 2e-4).abs() < 0.01 * 2e-4, "my = {my}");
    assert!((sol.flux(r, 0) - 0.02).abs() < 0.01 * 0.02);
}

/// 3x1 row of pure absorber with a steep linear source in the left cell.
fn steep_gradient_row(allow_negative_flux: bool) -> mt_solver::Solution {
    let mut b = LatticeBuilder::new(3, 1, 1.0, 1.0);
    let m = b.add_material("medium");
    let pin = b.add_pin_cell(PinCell::homogeneous("cell", m, 1));
    b.fill(pin).set_all_boundaries(BoundaryType::Vacuum);
    let g = b.build().unwrap();
    let lib = MaterialLibrary::from_materials([one_group(3.0, 0.0)]).unwrap();
    let opts = SolverOptions {
        source_mode: SourceMode::Linear,
        allow_negative_flux,
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let left = RegionId::from_index(0);
    solver.set_fixed_source(left, 0, 1.0).unwrap();
    solver.set_fixed_source_moments(left, 0, -1.0, 0.0).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    sol
}

#[test]
fn negative_flux_survives_when_allowed() {
    let sol = steep_gradient_row(true);
    assert!(sol.scalar_flux[0] > 0.0);
    assert!(sol.scalar_flux[1] < 0.0, "{:?}", sol.scalar_flux);
    assert!(sol.scalar_flux[2] < 0.0, "{:?}", sol.scalar_flux);
}

#[test]
fn negative_flux_is_clamped_to_zero_by_default() {
    let clamped = steep_gradient_row(false);
    assert_eq!(clamped.scalar_flux[1], 0.0);
    assert_eq!(clamped.scalar_flux[2], 0.0);
    let free = steep_gradient_row(true);
    assert!((clamped.scalar_flux[0] - free.scalar_flux[0]).abs() < 1e-3 * free.scalar_flux[0]);
}

#[test]
fn thread_count_only_perturbs_round_off() {
    let g = homogeneous_lattice(3, 1.0, BoundaryType::Vacuum);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.6)]).unwrap();
    let run = |threads| {
        let opts = SolverOptions {
            num_threads: threads,
            ..options()
        };
        let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
        solver.set_fixed_source(RegionId::from_index(4), 0, 1.0).unwrap();
        solver.solve().unwrap()
    };
    let serial = run(1);
    let parallel = run(3);
    for (a, b) in serial.scalar_flux.iter().zip(&parallel.scalar_flux) {
        assert!((a - b).abs() <= 1e-9 * a.abs().max(1e-12));
    }
}

/// Two-group UO2 pin in water with reflective sides.
fn uo2_pin_library() -> MaterialLibrary {
    MaterialLibrary::from_materials([
        Material::new("fuel", 2)
            .with_total(vec![0.52, 1.30])
            .with_scatter(vec![0.44, 0.02, 0.0, 0.90])
            .with_fission(vec![0.009, 0.45], vec![1.0, 0.0]),
        Material::new("water", 2)
            .with_total(vec![0.60, 2.00])
            .with_scatter(vec![0.54, 0.055, 0.0, 1.97]),
    ])
    .unwrap()
}

fn pin_eigenvalue(cmfd: Option<CmfdOptions>) -> mt_solver::Solution {
    let g = pin_geometry(1, 1);
    let lib = uo2_pin_library();
    let opts = SolverOptions {
        mode: SolveMode::Eigenvalue,
        num_azim: 8,
        track_spacing: 0.05,
        num_polar: 2,
        tolerance: 1e-7,
        max_iterations: 5000,
        cmfd,
        ..Default::default()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    let sol = solver.solve().unwrap();
    assert!(sol.converged);
    sol
}

#[test]
fn cmfd_cuts_outer_iterations_of_pin_eigenvalue() {
    let plain = pin_eigenvalue(None);
    let accelerated = pin_eigenvalue(Some(CmfdOptions::default()));
    let (k_plain, k_cmfd) = (plain.k_eff.unwrap(), accelerated.k_eff.unwrap());
    assert!((k_plain - k_cmfd).abs() < 1e-4, "{k_plain} vs {k_cmfd}");
    assert!(
        accelerated.iterations < plain.iterations,
        "{} with cmfd, {} without",
        accelerated.iterations,
        plain.iterations
    );
}

#[test]
fn cmfd_with_collapsed_groups_keeps_eigenvalue() {
    let plain = pin_eigenvalue(None);
    let collapsed = pin_eigenvalue(Some(CmfdOptions {
        group_structure: Some(vec![vec![0, 1]]),
        ..Default::default()
    }));
    let (k_plain, k_cmfd) = (plain.k_eff.unwrap(), collapsed.k_eff.unwrap());
    assert!((k_plain - k_cmfd).abs() < 1e-4, "{k_plain} vs {k_cmfd}");
}

#[test]
fn cmfd_fixed_source_converges_faster_to_the_same_flux() {
    let g = homogeneous_lattice(5, 1.0, BoundaryType::Vacuum);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.9)]).unwrap();
    let run = |cmfd: Option<CmfdOptions>| {
        let opts = SolverOptions {
            cmfd,
            ..options()
        };
        let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
        solver.set_fixed_source_in(all_regions(&g), 0, 1.0).unwrap();
        let sol = solver.solve().unwrap();
        assert!(sol.converged);
        let imbalance = solver.cmfd_step().map(|step| step.imbalance);
        let cells = solver.cmfd().map(|c| c.region_cells().to_vec());
        (sol, imbalance, cells)
    };
    let (plain, no_step, no_cells) = run(None);
    assert!(no_step.is_none() && no_cells.is_none());

    let (accelerated, imbalance, cells) = run(Some(CmfdOptions {
        mesh: [5, 5],
        ..Default::default()
    }));
    assert!(accelerated.iterations < plain.iterations);
    for (a, b) in accelerated.scalar_flux.iter().zip(&plain.scalar_flux) {
        assert!((a - b).abs() < 1e-5 * b, "{a} vs {b}");
    }
    let imbalance = imbalance.unwrap();
    assert!(imbalance < 1e-9, "imbalance {imbalance}");
    // One region per lattice cell, numbered like the mesh.
    assert_eq!(cells.unwrap(), (0..25).collect::<Vec<_>>());
}

#[test]
fn cmfd_mesh_must_follow_region_boundaries() {
    let g = pin_geometry(1, 1);
    let lib = uo2_pin_library();
    let opts = SolverOptions {
        mode: SolveMode::Eigenvalue,
        cmfd: Some(CmfdOptions {
            mesh: [2, 2],
            ..Default::default()
        }),
        ..options()
    };
    let mut solver = MocSolver::new(&g, &lib, opts).unwrap();
    assert!(matches!(
        solver.generate_tracks(),
        Err(SolverError::Configuration { .. })
    ));

    let bad_groups = SolverOptions {
        cmfd: Some(CmfdOptions {
            group_structure: Some(vec![vec![0]]),
            ..Default::default()
        }),
        ..options()
    };
    assert!(matches!(
        MocSolver::new(&g, &lib, bad_groups),
        Err(SolverError::Configuration { .. })
    ));
}

#[test]
fn progress_reports_every_iteration() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    solver.set_fixed_source(RegionId::from_index(0), 0, 1.0).unwrap();
    let mut events = Vec::new();
    let sol = solver.solve_with_progress(|e| events.push(*e)).unwrap();
    assert_eq!(events.first().map(|e| e.state), Some(SolverState::Init));
    assert_eq!(events.last().map(|e| e.state), Some(SolverState::Converged));
    assert!(events.last().unwrap().state.is_terminal());
    assert!(events.iter().rev().skip(1).all(|e| !e.state.is_terminal()));
    let checks = events
        .iter()
        .filter(|e| e.state == SolverState::Check)
        .count();
    assert_eq!(checks, sol.iterations);
}

#[test]
fn track_counts_available_after_generation() {
    let g = homogeneous_lattice(2, 1.0, BoundaryType::Reflective);
    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    assert_eq!(solver.num_tracks(), 0);
    solver.generate_tracks().unwrap();
    assert!(solver.num_tracks() > 0);
    assert!(solver.num_segments() >= solver.num_tracks());
    assert_eq!(solver.num_regions(), 4);
    let row = solver.fsr_table().unwrap().row(RegionId::from_index(3));
    assert!(row.volume > 0.0);
    assert_eq!(row.scalar_flux.len(), 1);
}

#[test]
fn configuration_errors_surface_before_solving() {
    let g = homogeneous_lattice(1, 1.0, BoundaryType::Reflective);
    let other = MaterialLibrary::from_materials([Material::new("other", 1)
        .with_total(vec![1.0])])
    .unwrap();
    assert!(matches!(
        MocSolver::new(&g, &other, options()),
        Err(SolverError::Configuration { .. })
    ));

    let lib = MaterialLibrary::from_materials([one_group(1.0, 0.5)]).unwrap();
    let eigen = SolverOptions {
        mode: SolveMode::Eigenvalue,
        ..options()
    };
    assert!(matches!(
        MocSolver::new(&g, &lib, eigen),
        Err(SolverError::Configuration { .. })
    ));

    let bad = SolverOptions {
        num_azim: 6,
        ..options()
    };
    assert!(matches!(
        MocSolver::new(&g, &lib, bad),
        Err(SolverError::Configuration { .. })
    ));

    let mut solver = MocSolver::new(&g, &lib, options()).unwrap();
    assert!(solver.set_initial_flux(vec![1.0; 3]).is_err());
    assert!(solver.set_fixed_source(RegionId::from_index(5), 0, 1.0).is_err());
    assert!(solver.fission_rates().is_err());
}
