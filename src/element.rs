use nalgebra::{matrix, Matrix3, SMatrix, SVector, Vector2, Vector3};

use crate::error::OlivineError;
use crate::geometry::{Point, Triangle};

/// Plane-stress material parameters, validated at construction and
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    young: f64,
    poisson: f64,
    thickness: f64,
}

impl Material {
    /// Creates a material from Young's modulus, Poisson's ratio, and part
    /// thickness.
    ///
    /// # Errors
    /// Fails with a validation error when young <= 0, poisson is outside
    /// (0, 0.5), or thickness <= 0.
    pub fn new(young: f64, poisson: f64, thickness: f64) -> Result<Self, OlivineError> {
        if !(young > 0.0) {
            return Err(OlivineError::Validation(
                "Young's modulus must be greater than zero".to_string(),
            ));
        }

        if !(poisson > 0.0 && poisson < 0.5) {
            return Err(OlivineError::Validation(
                "Poisson's ratio must be between 0 and 0.5".to_string(),
            ));
        }

        if !(thickness > 0.0) {
            return Err(OlivineError::Validation(
                "thickness must be greater than zero".to_string(),
            ));
        }

        Ok(Material {
            young,
            poisson,
            thickness,
        })
    }

    pub fn young(&self) -> f64 {
        self.young
    }

    pub fn poisson(&self) -> f64 {
        self.poisson
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }
}

/// An external load: an application point and a direction vector whose
/// length is the load magnitude.
#[derive(Debug, Clone, Copy)]
pub struct Force {
    pub position: Point,
    pub direction: Vector2<f64>,
}

impl Force {
    pub fn new(position: Point, direction_x: f64, direction_y: f64) -> Self {
        Force {
            position,
            direction: Vector2::new(direction_x, direction_y),
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.direction.norm()
    }
}

/// One linear constant-strain triangle element.
///
/// The elasticity, geometry, and stiffness matrices are derived once at
/// construction. The local displacement vector arrives from the global
/// solver after a run; the post-solve accessors fail until then.
#[derive(Debug, Clone)]
pub struct FiniteElement {
    triangle: Triangle,
    elasticity: Matrix3<f64>,
    geometry: SMatrix<f64, 3, 6>,
    stiffness: SMatrix<f64, 6, 6>,
    displacements: Option<SVector<f64, 6>>,
}

impl FiniteElement {
    pub fn new(material: &Material, triangle: Triangle) -> Self {
        let area = triangle.area();

        // elasticity matrix
        let mut elasticity: Matrix3<f64> = matrix![
            1.0, material.poisson(), 0.0;
            material.poisson(), 1.0, 0.0;
            0.0, 0.0, (1.0 - material.poisson()) / 2.0;
        ];
        elasticity *= material.young() / (1.0 - material.poisson().powi(2));

        // cyclic vertex coordinate differences
        let y12 = (triangle[1].y - triangle[2].y) as f64;
        let y20 = (triangle[2].y - triangle[0].y) as f64;
        let y01 = (triangle[0].y - triangle[1].y) as f64;
        let x21 = (triangle[2].x - triangle[1].x) as f64;
        let x02 = (triangle[0].x - triangle[2].x) as f64;
        let x10 = (triangle[1].x - triangle[0].x) as f64;

        // geometry matrix
        let mut geometry: SMatrix<f64, 3, 6> = matrix![
            y12, 0.0, y20, 0.0, y01, 0.0;
            0.0, x21, 0.0, x02, 0.0, x10;
            x21, y12, x02, y20, x10, y01;
        ];
        geometry /= 2.0 * area;

        // stiffness matrix
        let stiffness =
            (geometry.transpose() * elasticity) * geometry * (material.thickness() * area);

        FiniteElement {
            triangle,
            elasticity,
            geometry,
            stiffness,
            displacements: None,
        }
    }

    pub fn triangle(&self) -> &Triangle {
        &self.triangle
    }

    pub fn elasticity(&self) -> &Matrix3<f64> {
        &self.elasticity
    }

    pub fn geometry(&self) -> &SMatrix<f64, 3, 6> {
        &self.geometry
    }

    pub fn stiffness(&self) -> &SMatrix<f64, 6, 6> {
        &self.stiffness
    }

    /// Stores the solved local displacement vector, three stacked XY pairs
    /// in vertex order. The solver calls this after a successful run.
    pub(crate) fn set_displacements(&mut self, displacements: SVector<f64, 6>) {
        self.displacements = Some(displacements);
    }

    fn local_displacements(&self) -> Result<SVector<f64, 6>, OlivineError> {
        self.displacements.ok_or_else(|| {
            OlivineError::Numerical(
                "element displacements are not available before a solve".to_string(),
            )
        })
    }

    /// The element deformation vector, geometry matrix times the local
    /// displacements.
    pub fn deformation(&self) -> Result<Vector3<f64>, OlivineError> {
        Ok(self.geometry * self.local_displacements()?)
    }

    /// The element strain vector, elasticity matrix times the deformation.
    pub fn strain(&self) -> Result<Vector3<f64>, OlivineError> {
        Ok(self.elasticity * self.deformation()?)
    }

    /// Von Mises equivalent stress over the strain components.
    pub fn von_mises_stress(&self) -> Result<f64, OlivineError> {
        let s = self.strain()?;

        Ok((s[0].powi(2) - s[0] * s[1] + s[1].powi(2) + 3.0 * s[2].powi(2)).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_material() -> Material {
        Material::new(200.0, 0.3, 1.0).unwrap()
    }

    fn right_triangle() -> Triangle {
        Triangle::new(Point::new(0, 0), Point::new(10, 0), Point::new(0, 10))
    }

    #[test]
    fn material_rejects_out_of_range_parameters() {
        assert!(Material::new(0.0, 0.3, 1.0).is_err());
        assert!(Material::new(-5.0, 0.3, 1.0).is_err());
        assert!(Material::new(200.0, 0.0, 1.0).is_err());
        assert!(Material::new(200.0, 0.5, 1.0).is_err());
        assert!(Material::new(200.0, 0.3, 0.0).is_err());
        assert!(Material::new(200.0, 0.3, 1.0).is_ok());
    }

    #[test]
    fn force_magnitude_is_direction_norm() {
        let f = Force::new(Point::new(0, 0), 3.0, 4.0);
        assert_relative_eq!(f.magnitude(), 5.0);
    }

    #[test]
    fn elasticity_matrix_matches_plane_stress_form() {
        let element = FiniteElement::new(&unit_material(), right_triangle());
        let scale = 200.0 / (1.0 - 0.3 * 0.3);
        let e = element.elasticity();

        assert_relative_eq!(e[(0, 0)], scale, epsilon = 1e-9);
        assert_relative_eq!(e[(0, 1)], scale * 0.3, epsilon = 1e-9);
        assert_relative_eq!(e[(1, 0)], scale * 0.3, epsilon = 1e-9);
        assert_relative_eq!(e[(2, 2)], scale * 0.35, epsilon = 1e-9);
        assert_relative_eq!(e[(0, 2)], 0.0);
    }

    #[test]
    fn stiffness_matrix_is_symmetric() {
        let element = FiniteElement::new(&unit_material(), right_triangle());
        let k = element.stiffness();

        for row in 0..6 {
            for col in 0..6 {
                assert_relative_eq!(k[(row, col)], k[(col, row)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn rigid_translation_produces_no_elastic_forces() {
        let element = FiniteElement::new(&unit_material(), right_triangle());

        let shift_x = SVector::<f64, 6>::from_column_slice(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let shift_y = SVector::<f64, 6>::from_column_slice(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

        for shift in [shift_x, shift_y] {
            let reaction = element.stiffness() * shift;
            for i in 0..6 {
                assert_relative_eq!(reaction[i], 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn results_are_unavailable_before_a_solve() {
        let element = FiniteElement::new(&unit_material(), right_triangle());

        assert!(matches!(
            element.deformation(),
            Err(OlivineError::Numerical(_))
        ));
        assert!(matches!(element.strain(), Err(OlivineError::Numerical(_))));
        assert!(matches!(
            element.von_mises_stress(),
            Err(OlivineError::Numerical(_))
        ));
    }

    #[test]
    fn uniform_stretch_recovers_the_imposed_strain() {
        let material = unit_material();
        let mut element = FiniteElement::new(&material, right_triangle());

        // ux = 0.001 * x imposes a uniform deformation (0.001, 0, 0).
        element.set_displacements(SVector::<f64, 6>::from_column_slice(&[
            0.0, 0.0, 0.01, 0.0, 0.0, 0.0,
        ]));

        let deformation = element.deformation().unwrap();
        assert_relative_eq!(deformation[0], 0.001, epsilon = 1e-12);
        assert_relative_eq!(deformation[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(deformation[2], 0.0, epsilon = 1e-12);

        let scale = 200.0 / (1.0 - 0.09);
        let strain = element.strain().unwrap();
        assert_relative_eq!(strain[0], scale * 0.001, epsilon = 1e-9);
        assert_relative_eq!(strain[1], scale * 0.3 * 0.001, epsilon = 1e-9);
        assert_relative_eq!(strain[2], 0.0, epsilon = 1e-12);

        let s0 = scale * 0.001;
        let s1 = scale * 0.3 * 0.001;
        let expected = (s0 * s0 - s0 * s1 + s1 * s1).sqrt();
        assert_relative_eq!(element.von_mises_stress().unwrap(), expected, epsilon = 1e-9);
    }
}
