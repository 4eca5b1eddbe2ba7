use std::collections::HashMap;

use log::info;

use crate::error::OlivineError;
use crate::geometry::Point;
use crate::solver::Analysis;

/// Writes analysis results to two CSV files: per-point displacements and
/// per-element von Mises stress.
///
/// # Arguments
/// * `analysis` - A completed analysis run
/// * `points` - The point list the analysis was run with
/// * `nodes_output` - The filename of the output nodes csv
/// * `elements_output` - The filename of the output elements csv
pub fn csv_output(
    analysis: &Analysis,
    points: &[Point],
    nodes_output: &str,
    elements_output: &str,
) -> Result<(), OlivineError> {
    let mut nodes_csv = String::from("x,y,fixed,ux,uy\n");

    for (p, u) in points.iter().zip(&analysis.displacements) {
        nodes_csv.push_str(&format!("{},{},{},{},{}\n", p.x, p.y, p.fixed, u.x, u.y));
    }

    std::fs::write(nodes_output, nodes_csv)
        .map_err(|err| OlivineError::Output(format!("failed to write {}: {}", nodes_output, err)))?;

    let mut index: HashMap<Point, usize> = HashMap::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        index.entry(*p).or_insert(i);
    }

    let mut elements_csv = String::from("n0,n1,n2,stress\n");

    for element in &analysis.elements {
        let triangle = element.triangle();
        let mut slots = [0usize; 3];

        for (v, slot) in slots.iter_mut().enumerate() {
            *slot = *index.get(&triangle[v]).ok_or_else(|| {
                OlivineError::Output(format!(
                    "element vertex ({}, {}) is not among the output points",
                    triangle[v].x, triangle[v].y
                ))
            })?;
        }

        let stress = element.von_mises_stress()?;
        elements_csv.push_str(&format!(
            "{},{},{},{}\n",
            slots[0], slots[1], slots[2], stress
        ));
    }

    std::fs::write(elements_output, elements_csv).map_err(|err| {
        OlivineError::Output(format!("failed to write {}: {}", elements_output, err))
    })?;

    info!("wrote results to {} and {}", nodes_output, elements_output);

    Ok(())
}
