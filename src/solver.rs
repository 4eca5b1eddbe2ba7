use std::collections::HashMap;
use std::time::Instant;

use indicatif::ProgressBar;
use log::info;
use nalgebra::{DMatrix, DVector, SVector, Vector2};

use crate::element::{FiniteElement, Force, Material};
use crate::error::OlivineError;
use crate::geometry::{Point, Triangle};

/// Degrees of freedom per point (X and Y displacement).
pub const DOF: usize = 2;

/// Pivots smaller than this are treated as a singular system.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Results of one analysis run.
#[derive(Debug)]
pub struct Analysis {
    /// Per-point displacement pairs, ordered like the supplied point list.
    /// Fixed points are exactly (0, 0).
    pub displacements: Vec<Vector2<f64>>,
    /// One element per input triangle, local displacements populated.
    pub elements: Vec<FiniteElement>,
}

/// First index of each coordinate value; duplicate coordinates keep their
/// first occurrence.
fn point_index(points: &[Point]) -> HashMap<Point, usize> {
    let mut index = HashMap::with_capacity(points.len());

    for (i, p) in points.iter().enumerate() {
        index.entry(*p).or_insert(i);
    }

    index
}

/// Index of the point nearest to `target` (first strict minimum).
fn nearest_point_index(points: &[Point], target: Point) -> usize {
    let mut min_distance = f64::MAX;
    let mut min_index = 0;

    for (i, p) in points.iter().enumerate() {
        let distance = target.distance_to(*p);

        if distance < min_distance {
            min_distance = distance;
            min_index = i;
        }
    }

    min_index
}

/// Assembles the global stiffness matrix from the element stiffness
/// matrices.
///
/// Local row/column `r` of an element scatters to global index
/// `2 * index(vertex(r / 2)) + r % 2`; cells touched by several elements
/// accumulate. The result is symmetric until constraints are applied.
///
/// # Errors
/// Fails with a validation error when a triangle vertex is not among the
/// analysis points.
pub fn assemble_global_stiffness(
    elements: &[FiniteElement],
    points: &[Point],
) -> Result<DMatrix<f64>, OlivineError> {
    let index = point_index(points);
    let mut global: DMatrix<f64> = DMatrix::zeros(points.len() * DOF, points.len() * DOF);

    let bar = ProgressBar::new(elements.len() as u64);

    for element in elements {
        let mut vertex_indices = [0usize; 3];

        for (v, slot) in vertex_indices.iter_mut().enumerate() {
            let vertex = element.triangle()[v];
            *slot = *index.get(&vertex).ok_or_else(|| {
                OlivineError::Validation(format!(
                    "triangle vertex ({}, {}) is not among the analysis points",
                    vertex.x, vertex.y
                ))
            })?;
        }

        for row in 0..DOF * 3 {
            let global_row = DOF * vertex_indices[row / 2] + row % 2;

            for col in 0..DOF * 3 {
                let global_col = DOF * vertex_indices[col / 2] + col % 2;
                global[(global_row, global_col)] += element.stiffness()[(row, col)];
            }
        }

        bar.inc(1);
    }

    bar.finish();

    Ok(global)
}

/// Builds the global force vector by snapping each force with positive
/// magnitude to its nearest mesh point and accumulating the components.
pub fn assemble_global_forces(points: &[Point], forces: &[Force]) -> DVector<f64> {
    let mut global: DVector<f64> = DVector::zeros(points.len() * DOF);

    for force in forces {
        if force.magnitude() <= 0.0 {
            continue;
        }

        let pt = nearest_point_index(points, force.position);
        global[pt * DOF] += force.direction.x;
        global[pt * DOF + 1] += force.direction.y;
    }

    global
}

/// Decouples every fixed degree of freedom: its matrix row and column are
/// zeroed except for a unit diagonal and its force entry is zeroed, which
/// leaves the directly satisfied equation `displacement = 0`.
pub fn apply_fixed_constraints(
    stiffness: &mut DMatrix<f64>,
    forces: &mut DVector<f64>,
    points: &[Point],
) {
    let n = stiffness.nrows();

    for (i, p) in points.iter().enumerate() {
        if !p.fixed {
            continue;
        }

        for dof in 0..DOF {
            let d = i * DOF + dof;

            for j in 0..n {
                stiffness[(d, j)] = 0.0;
                stiffness[(j, d)] = 0.0;
            }

            stiffness[(d, d)] = 1.0;
            forces[d] = 0.0;
        }
    }
}

/// Solves `a * x = b` by Gaussian elimination without pivoting.
///
/// The forward pass normalizes each pivot row by its diagonal and
/// eliminates entries below it; the backward pass then eliminates entries
/// above each unit pivot. No rows are exchanged, so a (near-)zero diagonal
/// pivot fails explicitly instead of propagating NaN.
pub fn solve_gauss(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, OlivineError> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "coefficient matrix must be square");
    assert_eq!(n, b.len(), "right side length must match the matrix");

    // Augmented working copy; the input stays untouched.
    let mut m: DMatrix<f64> = DMatrix::zeros(n, n + 1);
    m.view_mut((0, 0), (n, n)).copy_from(a);
    m.column_mut(n).copy_from(b);

    // Forward feed: unit pivots, zeros below.
    for k in 0..n {
        let pivot = m[(k, k)];

        if pivot.abs() < PIVOT_TOLERANCE {
            return Err(OlivineError::Numerical(format!(
                "singular system: zero pivot at row {}",
                k
            )));
        }

        for j in 0..=n {
            m[(k, j)] /= pivot;
        }

        for i in k + 1..n {
            let coeff = m[(i, k)];

            for j in 0..=n {
                m[(i, j)] -= m[(k, j)] * coeff;
            }
        }
    }

    // Backward feed: zeros above.
    for k in (0..n).rev() {
        for i in (0..k).rev() {
            let coeff = m[(i, k)];

            for j in 0..=n {
                m[(i, j)] -= m[(k, j)] * coeff;
            }
        }
    }

    Ok(DVector::from_fn(n, |i, _| m[(i, n)]))
}

/// Runs a full analysis: builds one element per triangle, assembles and
/// constrains the global system, solves it, and distributes the solution.
///
/// # Arguments
/// * `triangles` - The triangulated body
/// * `material` - Material shared by every element
/// * `points` - Every mesh point; order fixes the degree-of-freedom layout
/// * `forces` - Applied loads, snapped to their nearest points
///
/// # Errors
/// Fails with a validation error when fewer than 2 points are fixed, or no
/// triangles or forces are supplied; with a numerical error when the
/// constrained system is singular.
pub fn run(
    triangles: &[Triangle],
    material: &Material,
    points: &[Point],
    forces: &[Force],
) -> Result<Analysis, OlivineError> {
    let fixed_count = points.iter().filter(|p| p.fixed).count();

    if fixed_count < 2 {
        return Err(OlivineError::Validation(format!(
            "analysis needs at least 2 fixed points, found {}",
            fixed_count
        )));
    }

    if triangles.is_empty() {
        return Err(OlivineError::Validation(
            "analysis needs at least one triangle".to_string(),
        ));
    }

    if forces.is_empty() {
        return Err(OlivineError::Validation(
            "analysis needs at least one force".to_string(),
        ));
    }

    info!("building {} finite elements...", triangles.len());
    let bar = ProgressBar::new(triangles.len() as u64);
    let mut elements: Vec<FiniteElement> = Vec::with_capacity(triangles.len());

    for triangle in triangles {
        elements.push(FiniteElement::new(material, *triangle));
        bar.inc(1);
    }

    bar.finish();

    info!("assembling global system for {} points...", points.len());
    let mut stiffness = assemble_global_stiffness(&elements, points)?;
    let mut global_forces = assemble_global_forces(points, forces);

    apply_fixed_constraints(&mut stiffness, &mut global_forces, points);

    info!("solving {} equations...", global_forces.len());
    let start = Instant::now();
    let solution = solve_gauss(&stiffness, &global_forces)?;
    info!(
        "solved system in {:.3} seconds",
        start.elapsed().as_secs_f32()
    );

    // Consecutive solution pairs become point displacements; fixed points
    // stay at zero regardless of the solved values.
    let displacements: Vec<Vector2<f64>> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if p.fixed {
                Vector2::zeros()
            } else {
                Vector2::new(solution[i * DOF], solution[i * DOF + 1])
            }
        })
        .collect();

    let index = point_index(points);

    for element in &mut elements {
        let mut local = SVector::<f64, 6>::zeros();

        for v in 0..3 {
            let pt = index[&element.triangle()[v]];
            local[v * DOF] = displacements[pt].x;
            local[v * DOF + 1] = displacements[pt].y;
        }

        element.set_displacements(local);
    }

    Ok(Analysis {
        displacements,
        elements,
    })
}
