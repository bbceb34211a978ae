//! Developmental simulation: expanding a genome into a voxel body.
//!
//! A [`Developer`] opens one [`DevelopmentSession`] per run. The session is the
//! stateful simulation context (device handles, scratch grids); exactly one
//! genome is loaded into it at a time and calls are strictly sequential.
//! Dropping the session releases the context.

use crate::schema::{GenomeLayout, MAX_VOXEL_SIDE};

use super::VoxelGrid;
use super::evolution::ByteGenome;

/// Error type for developmental simulation.
#[derive(Debug, thiserror::Error)]
pub enum DevelopError {
    #[error("Failed to create development context: {0}")]
    ContextCreation(String),

    #[error("Genome of {actual} bytes does not match the {expected}-byte layout")]
    GenomeSize { expected: usize, actual: usize },

    #[error("No genome loaded into the development context")]
    NotLoaded,

    #[error("Voxel grid side {actual} does not match context side {expected}")]
    GridMismatch { expected: usize, actual: usize },
}

/// Factory for development sessions.
pub trait Developer<G> {
    type Session: DevelopmentSession<G>;

    /// Create the simulation context for a run.
    fn open_session(&self) -> Result<Self::Session, DevelopError>;
}

/// A live simulation context.
pub trait DevelopmentSession<G> {
    /// Load a genome, resetting the embryo.
    fn load(&mut self, genome: &G) -> Result<(), DevelopError>;

    /// Advance development of the loaded genome.
    fn develop(&mut self, steps: u32) -> Result<(), DevelopError>;

    /// Write the current body into a phenotype buffer.
    fn extract_body(&mut self, out: &mut VoxelGrid) -> Result<(), DevelopError>;
}

/// Bytes of a rule field read by the growth model: direction, timing, child type.
const RULE_BYTES: usize = 3;

/// Rule timing bytes at or above this value mark the rule dormant.
const DORMANT_THRESHOLD: u8 = 192;

const DIRECTIONS: [[isize; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// CPU cell-division growth model over [`ByteGenome`]s.
///
/// Development starts from one type-0 cell in the centre of the grid. Every
/// step each cell consults the `fields` rules of its type; an active rule whose
/// period divides the cell's age places a daughter cell of the rule's child
/// type in the neighbouring voxel it points at, if that voxel is empty. The
/// first two global bytes cap the number of cells.
#[derive(Debug, Clone)]
pub struct GrowthDeveloper {
    layout: GenomeLayout,
    side: usize,
}

impl GrowthDeveloper {
    pub fn new(layout: GenomeLayout, side: usize) -> Self {
        Self { layout, side }
    }
}

impl Developer<ByteGenome> for GrowthDeveloper {
    type Session = GrowthSession;

    fn open_session(&self) -> Result<GrowthSession, DevelopError> {
        self.layout
            .validate()
            .map_err(|e| DevelopError::ContextCreation(e.to_string()))?;
        if self.side == 0 || self.side > MAX_VOXEL_SIDE {
            return Err(DevelopError::ContextCreation(format!(
                "unsupported grid side {}",
                self.side
            )));
        }
        if self.layout.field_bytes < RULE_BYTES {
            return Err(DevelopError::ContextCreation(format!(
                "growth rules need {} bytes per field, layout has {}",
                RULE_BYTES, self.layout.field_bytes
            )));
        }

        log::debug!(
            "Opened growth session ({}^3 voxels, {} cell types)",
            self.side,
            self.layout.cell_types
        );

        Ok(GrowthSession {
            layout: self.layout,
            grid: VoxelGrid::new(self.side),
            rules: Vec::with_capacity(self.layout.cell_types * self.layout.fields),
            cells: Vec::new(),
            max_cells: 0,
            loaded: false,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct GrowthRule {
    direction: usize,
    period: u32,
    child_type: u8,
    active: bool,
}

impl GrowthRule {
    fn parse(bytes: &[u8], cell_types: usize) -> Self {
        Self {
            direction: bytes[0] as usize % DIRECTIONS.len(),
            period: 1 + (bytes[1] % 8) as u32,
            child_type: (bytes[2] as usize % cell_types) as u8,
            active: bytes[1] < DORMANT_THRESHOLD,
        }
    }

    #[inline]
    fn fires(&self, age: u32) -> bool {
        self.active && age % self.period == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct GrowingCell {
    pos: [usize; 3],
    cell_type: u8,
    age: u32,
}

/// Session of the [`GrowthDeveloper`].
#[derive(Debug)]
pub struct GrowthSession {
    layout: GenomeLayout,
    grid: VoxelGrid,
    rules: Vec<GrowthRule>,
    cells: Vec<GrowingCell>,
    max_cells: usize,
    loaded: bool,
}

impl GrowthSession {
    /// Number of cells in the current embryo.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn neighbour(&self, pos: [usize; 3], direction: usize) -> Option<[usize; 3]> {
        let side = self.grid.side() as isize;
        let mut out = [0usize; 3];
        for axis in 0..3 {
            let v = pos[axis] as isize + DIRECTIONS[direction][axis];
            if v < 0 || v >= side {
                return None;
            }
            out[axis] = v as usize;
        }
        Some(out)
    }
}

impl DevelopmentSession<ByteGenome> for GrowthSession {
    fn load(&mut self, genome: &ByteGenome) -> Result<(), DevelopError> {
        let expected = self.layout.genome_len();
        let bytes = genome.as_bytes();
        if bytes.len() != expected {
            return Err(DevelopError::GenomeSize {
                expected,
                actual: bytes.len(),
            });
        }

        let layout = self.layout;
        self.rules.clear();
        self.rules.extend(
            bytes[..layout.cell_bytes()]
                .chunks_exact(layout.field_bytes)
                .map(|field| GrowthRule::parse(field, layout.cell_types)),
        );

        let volume = self.grid.volume();
        let globals = &bytes[layout.cell_bytes()..];
        self.max_cells = if globals.len() >= 2 {
            (u16::from_le_bytes([globals[0], globals[1]]) as usize % volume) + 1
        } else {
            volume
        };

        self.grid.clear();
        self.cells.clear();
        let c = self.grid.side() / 2;
        self.grid.set(c, c, c, 1);
        self.cells.push(GrowingCell {
            pos: [c, c, c],
            cell_type: 0,
            age: 0,
        });
        self.loaded = true;
        Ok(())
    }

    fn develop(&mut self, steps: u32) -> Result<(), DevelopError> {
        if !self.loaded {
            return Err(DevelopError::NotLoaded);
        }

        let fields = self.layout.fields;
        for _ in 0..steps {
            let alive = self.cells.len();
            for i in 0..alive {
                let cell = self.cells[i];
                let first = cell.cell_type as usize * fields;
                for r in first..first + fields {
                    if self.cells.len() >= self.max_cells {
                        break;
                    }
                    let rule = self.rules[r];
                    if !rule.fires(cell.age) {
                        continue;
                    }
                    if let Some([x, y, z]) = self.neighbour(cell.pos, rule.direction)
                        && self.grid.get(x, y, z) == 0
                    {
                        self.grid.set(x, y, z, rule.child_type + 1);
                        self.cells.push(GrowingCell {
                            pos: [x, y, z],
                            cell_type: rule.child_type,
                            age: 0,
                        });
                    }
                }
                self.cells[i].age += 1;
            }
        }
        Ok(())
    }

    fn extract_body(&mut self, out: &mut VoxelGrid) -> Result<(), DevelopError> {
        if !self.loaded {
            return Err(DevelopError::NotLoaded);
        }
        if out.side() != self.grid.side() {
            return Err(DevelopError::GridMismatch {
                expected: self.grid.side(),
                actual: out.side(),
            });
        }
        out.copy_from(&self.grid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GenomeLayout {
        GenomeLayout {
            cell_types: 2,
            fields: 2,
            field_bytes: 4,
            global_loci: 1,
            global_stride: 2,
        }
    }

    /// Genome whose type-0 cells grow +X into type 1 every step and whose
    /// type-1 cells are inert.
    fn rod_genome(max_cells: u16) -> ByteGenome {
        let layout = layout();
        let mut bytes = vec![0u8; layout.genome_len()];
        // type 0, field 0: +X, period 1, child type 1
        bytes[0..4].copy_from_slice(&[0, 0, 1, 0]);
        // type 0, field 1: dormant
        bytes[4..8].copy_from_slice(&[0, 255, 0, 0]);
        // type 1, fields 0 and 1: dormant
        bytes[8..12].copy_from_slice(&[0, 255, 0, 0]);
        bytes[12..16].copy_from_slice(&[0, 255, 0, 0]);
        let cap = max_cells.to_le_bytes();
        bytes[16] = cap[0];
        bytes[17] = cap[1];
        ByteGenome::new(bytes)
    }

    #[test]
    fn test_develop_requires_load() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        assert!(matches!(session.develop(1), Err(DevelopError::NotLoaded)));
    }

    #[test]
    fn test_open_rejects_short_fields() {
        let layout = GenomeLayout {
            field_bytes: 2,
            ..layout()
        };
        let developer = GrowthDeveloper::new(layout, 8);
        assert!(matches!(
            developer.open_session(),
            Err(DevelopError::ContextCreation(_))
        ));
    }

    #[test]
    fn test_open_rejects_invalid_layout() {
        for cell_types in [0, 256] {
            let layout = GenomeLayout {
                cell_types,
                ..layout()
            };
            let developer = GrowthDeveloper::new(layout, 8);
            assert!(matches!(
                developer.open_session(),
                Err(DevelopError::ContextCreation(_))
            ));
        }
    }

    #[test]
    fn test_most_cell_types_grow() {
        let layout = GenomeLayout {
            cell_types: 255,
            fields: 1,
            field_bytes: 4,
            global_loci: 1,
            global_stride: 2,
        };
        let mut bytes = vec![0u8; layout.genome_len()];
        // type 0: +X, period 1, last child type
        bytes[0..4].copy_from_slice(&[0, 0, 254, 0]);
        bytes[layout.cell_bytes()] = 50;

        let developer = GrowthDeveloper::new(layout, 8);
        let mut session = developer.open_session().unwrap();
        session.load(&ByteGenome::new(bytes)).unwrap();
        session.develop(1).unwrap();

        let mut grid = VoxelGrid::new(8);
        session.extract_body(&mut grid).unwrap();
        assert_eq!(grid.get(5, 4, 4), 255);
    }

    #[test]
    fn test_genome_size_checked() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        let result = session.load(&ByteGenome::new(vec![0; 3]));
        assert!(matches!(
            result,
            Err(DevelopError::GenomeSize {
                expected: 20,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_single_division() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        session.load(&rod_genome(100)).unwrap();
        session.develop(5).unwrap();

        // The seed divides once; its daughter is inert and the +X voxel stays full.
        assert_eq!(session.cell_count(), 2);

        let mut grid = VoxelGrid::new(8);
        session.extract_body(&mut grid).unwrap();
        assert_eq!(grid.get(4, 4, 4), 1);
        assert_eq!(grid.get(5, 4, 4), 2);
        assert_eq!(grid.occupied(), 2);
    }

    #[test]
    fn test_cell_cap() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        // Cap stored as value % volume + 1 = 1 cell.
        session.load(&rod_genome(0)).unwrap();
        session.develop(10).unwrap();
        assert_eq!(session.cell_count(), 1);
    }

    #[test]
    fn test_reload_resets_embryo() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        session.load(&rod_genome(100)).unwrap();
        session.develop(3).unwrap();
        session.load(&rod_genome(100)).unwrap();
        assert_eq!(session.cell_count(), 1);
    }

    #[test]
    fn test_extract_checks_grid_side() {
        let developer = GrowthDeveloper::new(layout(), 8);
        let mut session = developer.open_session().unwrap();
        session.load(&rod_genome(100)).unwrap();
        let mut grid = VoxelGrid::new(4);
        assert!(matches!(
            session.extract_body(&mut grid),
            Err(DevelopError::GridMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }
}
