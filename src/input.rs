use json::JsonValue;
use log::info;

use crate::element::{Force, Material};
use crate::error::OlivineError;
use crate::geometry::Point;
use crate::polygon::{Hole, Polygon};

/// An interior point scatter request from the model file.
#[derive(Debug, Clone, Copy)]
pub struct ScatterSpec {
    pub count: usize,
    pub min_distance: f64,
}

/// A fully parsed analysis model.
#[derive(Debug)]
pub struct Model {
    pub material: Material,
    pub polygon: Polygon,
    pub forces: Vec<Force>,
    pub scatter: Option<ScatterSpec>,
}

/// Loads and validates a model json file.
///
/// # Arguments
/// * `path` - The path to the model json
///
/// # Returns
/// The parsed model, ready for triangulation and analysis.
pub fn load_model(path: &str) -> Result<Model, OlivineError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| OlivineError::Input(format!("unable to open model file {}", path)))?;

    let root = json::parse(&contents)
        .map_err(|err| OlivineError::Input(format!("error in model json: {}", err)))?;

    parse_model(&root)
}

fn parse_model(root: &JsonValue) -> Result<Model, OlivineError> {
    if !root.has_key("material") {
        return Err(OlivineError::Input(
            "model json missing material section".to_string(),
        ));
    }
    if !root.has_key("boundary") {
        return Err(OlivineError::Input(
            "model json missing boundary section".to_string(),
        ));
    }
    if !root.has_key("forces") {
        return Err(OlivineError::Input(
            "model json missing forces section".to_string(),
        ));
    }

    let material = parse_material(&root["material"])?;

    let mut polygon = Polygon::new();

    for entry in root["boundary"].members() {
        polygon.add_boundary_point(parse_point(entry, "boundary")?);
    }

    for entry in root["inner_points"].members() {
        polygon.add_inner_point(parse_point(entry, "inner_points")?);
    }

    for hole_json in root["holes"].members() {
        let mut hole = Hole::new();

        for entry in hole_json.members() {
            hole.add_point(parse_point(entry, "holes")?);
        }

        // Geometry validation runs here, before any meshing.
        polygon.add_hole(hole)?;
    }

    let scatter = if root.has_key("scatter") {
        Some(parse_scatter(&root["scatter"])?)
    } else {
        None
    };

    let mut forces: Vec<Force> = Vec::new();
    for entry in root["forces"].members() {
        forces.push(parse_force(entry)?);
    }

    info!(
        "loaded model: {} boundary points, {} holes, {} forces",
        polygon.boundary().len(),
        polygon.holes().len(),
        forces.len()
    );

    Ok(Model {
        material,
        polygon,
        forces,
        scatter,
    })
}

fn parse_material(section: &JsonValue) -> Result<Material, OlivineError> {
    let young = section["young"]
        .as_f64()
        .ok_or_else(|| OlivineError::Input("missing young in material section".to_string()))?;
    let poisson = section["poisson"]
        .as_f64()
        .ok_or_else(|| OlivineError::Input("missing poisson in material section".to_string()))?;
    let thickness = section["thickness"]
        .as_f64()
        .ok_or_else(|| OlivineError::Input("missing thickness in material section".to_string()))?;

    Material::new(young, poisson, thickness)
}

fn parse_point(entry: &JsonValue, section: &str) -> Result<Point, OlivineError> {
    let x = entry["x"].as_i32().ok_or_else(|| {
        OlivineError::Input(format!("missing or non-integer x in {} entry", section))
    })?;
    let y = entry["y"].as_i32().ok_or_else(|| {
        OlivineError::Input(format!("missing or non-integer y in {} entry", section))
    })?;

    if entry["fixed"].as_bool().unwrap_or(false) {
        Ok(Point::fixed(x, y))
    } else {
        Ok(Point::new(x, y))
    }
}

fn parse_scatter(section: &JsonValue) -> Result<ScatterSpec, OlivineError> {
    let count = section["count"]
        .as_usize()
        .ok_or_else(|| OlivineError::Input("missing count in scatter section".to_string()))?;
    let min_distance = section["min_distance"].as_f64().ok_or_else(|| {
        OlivineError::Input("missing min_distance in scatter section".to_string())
    })?;

    Ok(ScatterSpec {
        count,
        min_distance,
    })
}

fn parse_force(entry: &JsonValue) -> Result<Force, OlivineError> {
    let x = entry["x"]
        .as_i32()
        .ok_or_else(|| OlivineError::Input("missing or non-integer x in force entry".to_string()))?;
    let y = entry["y"]
        .as_i32()
        .ok_or_else(|| OlivineError::Input("missing or non-integer y in force entry".to_string()))?;
    let fx = entry["fx"]
        .as_f64()
        .ok_or_else(|| OlivineError::Input("missing fx in force entry".to_string()))?;
    let fy = entry["fy"]
        .as_f64()
        .ok_or_else(|| OlivineError::Input("missing fy in force entry".to_string()))?;

    Ok(Force::new(Point::new(x, y), fx, fy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Model, OlivineError> {
        parse_model(&json::parse(text).unwrap())
    }

    #[test]
    fn complete_model_parses() {
        let model = parse(
            r#"{
                "material": { "young": 200000.0, "poisson": 0.3, "thickness": 1.0 },
                "boundary": [
                    { "x": 0, "y": 0, "fixed": true },
                    { "x": 100, "y": 0 },
                    { "x": 100, "y": 100 },
                    { "x": 0, "y": 100, "fixed": true }
                ],
                "inner_points": [ { "x": 50, "y": 50 } ],
                "holes": [[
                    { "x": 20, "y": 20 },
                    { "x": 40, "y": 20 },
                    { "x": 40, "y": 40 },
                    { "x": 20, "y": 40 }
                ]],
                "scatter": { "count": 10, "min_distance": 15.0 },
                "forces": [ { "x": 100, "y": 50, "fx": 0.0, "fy": 250.0 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(model.polygon.boundary().len(), 4);
        assert_eq!(model.polygon.inner_points().len(), 1);
        assert_eq!(model.polygon.holes().len(), 1);
        assert_eq!(model.forces.len(), 1);
        assert_eq!(model.polygon.fixed_points_count(), 2);
        assert_eq!(model.scatter.unwrap().count, 10);
        assert_eq!(model.material.poisson(), 0.3);
    }

    #[test]
    fn missing_material_is_an_input_error() {
        let result = parse(r#"{ "boundary": [], "forces": [] }"#);
        assert!(matches!(result, Err(OlivineError::Input(_))));
    }

    #[test]
    fn out_of_range_material_is_a_validation_error() {
        let result = parse(
            r#"{
                "material": { "young": -1.0, "poisson": 0.3, "thickness": 1.0 },
                "boundary": [],
                "forces": []
            }"#,
        );
        assert!(matches!(result, Err(OlivineError::Validation(_))));
    }

    #[test]
    fn misplaced_hole_is_a_geometry_error() {
        let result = parse(
            r#"{
                "material": { "young": 200000.0, "poisson": 0.3, "thickness": 1.0 },
                "boundary": [
                    { "x": 0, "y": 0 },
                    { "x": 50, "y": 0 },
                    { "x": 50, "y": 50 },
                    { "x": 0, "y": 50 }
                ],
                "holes": [[
                    { "x": 40, "y": 40 },
                    { "x": 80, "y": 40 },
                    { "x": 80, "y": 80 },
                    { "x": 40, "y": 80 }
                ]],
                "forces": []
            }"#,
        );
        assert!(matches!(result, Err(OlivineError::Geometry(_))));
    }

    #[test]
    fn non_integer_coordinate_is_an_input_error() {
        let result = parse(
            r#"{
                "material": { "young": 200000.0, "poisson": 0.3, "thickness": 1.0 },
                "boundary": [ { "x": 1.5, "y": 0 } ],
                "forces": []
            }"#,
        );
        assert!(matches!(result, Err(OlivineError::Input(_))));
    }
}
