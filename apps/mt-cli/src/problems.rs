//! Built-in benchmark problems.

use std::ops::Range;

use mt_core::Real;
use mt_geometry::{BoundaryType, LatticeBuilder, LatticeGeometry, PinCell};
use mt_solver::SolveMode;
use mt_xs::{Material, MaterialLibrary, XsError};

use crate::CliResult;

const PITCH: Real = 1.26;
const FUEL_RADIUS: Real = 0.4096;
const ROD_RADIUS: Real = 0.45;

/// Uniform fixed source over a block of regions.
pub struct SourceBlock {
    pub regions: Range<usize>,
    pub group: usize,
    pub strength: Real,
}

/// Named set of regions reported as a volume-averaged flux.
pub struct ReportZone {
    pub name: String,
    pub regions: Vec<usize>,
}

pub struct Problem {
    pub name: String,
    pub geometry: LatticeGeometry,
    pub library: MaterialLibrary,
    pub mode: SolveMode,
    pub sources: Vec<SourceBlock>,
    pub zones: Vec<ReportZone>,
}

fn uo2() -> Material {
    Material::new("uo2", 2)
        .with_total(vec![0.52, 1.30])
        .with_scatter(vec![0.44, 0.02, 0.0, 0.90])
        .with_fission(vec![0.009, 0.45], vec![1.0, 0.0])
        .with_sigma_f(vec![0.0035, 0.18])
}

fn water() -> Material {
    Material::new("water", 2)
        .with_total(vec![0.60, 2.00])
        .with_scatter(vec![0.54, 0.055, 0.0, 1.97])
}

fn absorber() -> Material {
    Material::new("absorber", 2)
        .with_total(vec![0.55, 2.40])
        .with_scatter(vec![0.47, 0.01, 0.0, 0.80])
}

fn library(materials: impl IntoIterator<Item = Material>) -> Result<MaterialLibrary, XsError> {
    MaterialLibrary::from_materials(materials)
}

/// Two-group UO2 pin in water with reflective sides (infinite lattice).
pub fn pin_cell(fuel_sectors: u32, water_sectors: u32) -> CliResult<Problem> {
    let mut b = LatticeBuilder::new(1, 1, PITCH, PITCH);
    let fuel = b.add_material("uo2");
    let moderator = b.add_material("water");
    let pin = b.add_pin_cell(
        PinCell::new("fuel pin")
            .ring(FUEL_RADIUS, fuel, fuel_sectors)
            .outer(moderator, water_sectors),
    );
    b.fill(pin).set_all_boundaries(BoundaryType::Reflective);
    let geometry = b.build()?;

    let zones = vec![
        ReportZone {
            name: "fuel".to_string(),
            regions: geometry.zone_regions(0, 0, 0).collect(),
        },
        ReportZone {
            name: "water".to_string(),
            regions: geometry.zone_regions(0, 0, 1).collect(),
        },
    ];
    Ok(Problem {
        name: format!("pin-cell (sectors {fuel_sectors}/{water_sectors})"),
        geometry,
        library: library([uo2(), water()])?,
        mode: SolveMode::Eigenvalue,
        sources: Vec::new(),
        zones,
    })
}

/// Square lattice of absorber rods around a central water cell holding a
/// fast-group source, with vacuum sides.
pub fn source_lattice(size: usize) -> CliResult<Problem> {
    let mut b = LatticeBuilder::new(size, size, PITCH, PITCH);
    let rod = b.add_material("absorber");
    let moderator = b.add_material("water");
    let rod_cell = b.add_pin_cell(PinCell::new("rod").ring(ROD_RADIUS, rod, 4).outer(moderator, 4));
    let source_cell = b.add_pin_cell(PinCell::homogeneous("source", moderator, 4));
    let center = size / 2;
    b.fill(rod_cell)
        .set_cell(center, center, source_cell)
        .set_all_boundaries(BoundaryType::Vacuum);
    let geometry = b.build()?;

    let sources = vec![SourceBlock {
        regions: geometry.cell_regions(center, center),
        group: 0,
        strength: 1.0,
    }];
    let zones = vec![
        ReportZone {
            name: "source cell".to_string(),
            regions: geometry.cell_regions(center, center).collect(),
        },
        ReportZone {
            name: "edge cell".to_string(),
            regions: geometry.cell_regions(size - 1, center).collect(),
        },
        ReportZone {
            name: "corner cell".to_string(),
            regions: geometry.cell_regions(0, 0).collect(),
        },
    ];
    Ok(Problem {
        name: format!("source-lattice ({size}x{size})"),
        geometry,
        library: library([absorber(), water()])?,
        mode: SolveMode::FixedSource,
        sources,
        zones,
    })
}
