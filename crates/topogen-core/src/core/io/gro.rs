use super::traits::TopologyFile;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use std::io::{self, Write};
use thiserror::Error;

pub const DEFAULT_BOX_MARGIN: f64 = 1.0;

#[derive(Debug, Error)]
pub enum GroError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot write an empty topology")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroMetadata {
    pub title: Option<String>,
    /// Padding in nm added around the molecule on every side.
    pub margin: f64,
}

impl Default for GroMetadata {
    fn default() -> Self {
        Self {
            title: None,
            margin: DEFAULT_BOX_MARGIN,
        }
    }
}

/// Writes the conformation in GROMACS `.gro` layout, centred in a box.
pub struct GroFile;

fn bounding_box(positions: &[Point3<f64>]) -> (Point3<f64>, Point3<f64>) {
    let mut lo = positions[0];
    let mut hi = positions[0];
    for p in &positions[1..] {
        for k in 0..3 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    (lo, hi)
}

impl TopologyFile for GroFile {
    type Metadata = GroMetadata;
    type Error = GroError;

    fn write_to(
        topology: &Topology,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let positions = topology.positions();
        if positions.is_empty() {
            return Err(GroError::Empty);
        }
        let (lo, hi) = bounding_box(&positions);
        let extent = hi - lo;
        let box_size = extent.add_scalar(2.0 * metadata.margin);
        let shift: Vector3<f64> = box_size / 2.0 - (lo.coords + extent / 2.0);

        writeln!(
            writer,
            "{}",
            metadata.title.as_deref().unwrap_or(&topology.name)
        )?;
        writeln!(writer, "{:5}", positions.len())?;
        for (i, position) in positions.iter().enumerate() {
            let p = position + shift;
            let residue: String = topology.residue_name(i).chars().take(5).collect();
            let name: String = topology.atom_name(i).chars().take(5).collect();
            writeln!(
                writer,
                "{:>5}{:<5}{:>5}{:>5}{:8.3}{:8.3}{:8.3}",
                1,
                residue,
                name,
                (i + 1) % 100_000,
                p.x,
                p.y,
                p.z
            )?;
        }
        writeln!(
            writer,
            "{:10.5}{:10.5}{:10.5}",
            box_size.x, box_size.y, box_size.z
        )?;
        Ok(())
    }
}
