use log::debug;
use rand::Rng;

use crate::error::OlivineError;
use crate::geometry::{Edge, Point};

/// Wrap-around edge list of a closed ring of points.
fn ring_edges(points: &[Point]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(points.len());
    let mut j = points.len().wrapping_sub(1);

    for i in 0..points.len() {
        edges.push(Edge::new(points[i], points[j]));
        j = i;
    }

    edges
}

/// Ring winding in the screen frame. Y is negated because screen
/// coordinates grow downward.
fn ring_clockwise(points: &[Point]) -> bool {
    let mut area = 0.0;

    for i in 0..points.len() {
        let next = (i + 1) % points.len();
        area += (points[i].x as f64) * (-points[next].y as f64)
            - (-points[i].y as f64) * (points[next].x as f64);
    }

    area < 0.0
}

/// Crossing-number containment test against a closed ring.
///
/// Counts edges whose Y span straddles the query point and whose
/// interpolated X crossing lies to its right.
fn ring_contains(points: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = points.len().wrapping_sub(1);

    for i in 0..points.len() {
        let a = points[i];
        let b = points[j];

        if (a.y > p.y) != (b.y > p.y) {
            let x_cross =
                ((b.x - a.x) as f64) * ((p.y - a.y) as f64) / ((b.y - a.y) as f64) + a.x as f64;

            if (p.x as f64) < x_cross {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

fn ring_self_intersects(points: &[Point]) -> bool {
    let edges = ring_edges(points);

    for (i, e1) in edges.iter().enumerate() {
        for e2 in edges.iter().skip(i + 1) {
            if e1.intersects(e2) && !e1.shares_endpoint(e2) {
                return true;
            }
        }
    }

    false
}

/// An interior cavity of a [`Polygon`]: a closed sub-boundary whose inside
/// carries no material.
#[derive(Debug, Clone, Default)]
pub struct Hole {
    points: Vec<Point>,
}

impl Hole {
    pub fn new() -> Self {
        Hole::default()
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Hole { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The hole's closed edge ring.
    pub fn edges(&self) -> Vec<Edge> {
        ring_edges(&self.points)
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    pub fn is_self_intersecting(&self) -> bool {
        ring_self_intersects(&self.points)
    }

    /// Winding in the screen frame.
    pub fn is_clockwise(&self) -> bool {
        ring_clockwise(&self.points)
    }

    pub fn contains(&self, p: Point) -> bool {
        ring_contains(&self.points, p)
    }
}

/// The analyzed body: an ordered outer boundary, scattered interior points,
/// and interior holes.
///
/// The boundary must not self-intersect to be valid for triangulation;
/// holes must lie fully inside the boundary and must not touch each other.
/// [`Polygon::add_hole`] enforces the hole invariants up front.
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    boundary: Vec<Point>,
    inner_points: Vec<Point>,
    holes: Vec<Hole>,
}

impl Polygon {
    pub fn new() -> Self {
        Polygon::default()
    }

    pub fn from_boundary(boundary: Vec<Point>) -> Self {
        Polygon {
            boundary,
            inner_points: Vec::new(),
            holes: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    pub fn inner_points(&self) -> &[Point] {
        &self.inner_points
    }

    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// Every mesh point: boundary, then interior, then hole points. This
    /// order is the point enumeration order used by triangulation and by
    /// the solver's degree-of-freedom numbering.
    pub fn points(&self) -> Vec<Point> {
        let mut all = self.boundary.clone();
        all.extend_from_slice(&self.inner_points);

        for hole in &self.holes {
            all.extend_from_slice(hole.points());
        }

        all
    }

    pub fn points_count(&self) -> usize {
        self.boundary.len()
            + self.inner_points.len()
            + self.holes.iter().map(|h| h.points().len()).sum::<usize>()
    }

    pub fn fixed_points_count(&self) -> usize {
        self.points().iter().filter(|p| p.fixed).count()
    }

    /// The outer boundary's closed edge ring.
    pub fn edges(&self) -> Vec<Edge> {
        ring_edges(&self.boundary)
    }

    /// Edge rings of every hole, concatenated.
    pub fn holes_edges(&self) -> Vec<Edge> {
        self.holes.iter().flat_map(|h| h.edges()).collect()
    }

    pub fn add_boundary_point(&mut self, p: Point) {
        self.boundary.push(p);
    }

    /// Removes the first boundary point at the given coordinates.
    pub fn remove_boundary_point(&mut self, p: Point) {
        if let Some(idx) = self.boundary.iter().position(|q| *q == p) {
            self.boundary.remove(idx);
        }
    }

    pub fn add_inner_point(&mut self, p: Point) {
        self.inner_points.push(p);
    }

    /// Removes the first interior point at the given coordinates.
    pub fn remove_inner_point(&mut self, p: Point) {
        if let Some(idx) = self.inner_points.iter().position(|q| *q == p) {
            self.inner_points.remove(idx);
        }
    }

    pub fn clear_points(&mut self) {
        self.boundary.clear();
        self.inner_points.clear();
    }

    pub fn clear_inner_points(&mut self) {
        self.inner_points.clear();
    }

    pub fn clear_holes(&mut self) {
        self.holes.clear();
    }

    pub fn is_self_intersecting(&self) -> bool {
        ring_self_intersects(&self.boundary)
    }

    /// Winding of the outer boundary in the screen frame.
    pub fn is_clockwise(&self) -> bool {
        ring_clockwise(&self.boundary)
    }

    pub fn reverse(&mut self) {
        self.boundary.reverse();
    }

    /// Normalizes the boundary to counter-clockwise and every hole to
    /// clockwise in the screen frame. These are the windings the mesher's
    /// trimming rules assume.
    pub fn normalize_windings(&mut self) {
        if self.is_clockwise() {
            self.reverse();
        }

        for hole in &mut self.holes {
            if !hole.is_clockwise() {
                hole.reverse();
            }
        }
    }

    /// Whether a point lies inside the boundary and outside every hole.
    pub fn contains(&self, p: Point) -> bool {
        if self.holes.iter().any(|hole| hole.contains(p)) {
            return false;
        }

        ring_contains(&self.boundary, p)
    }

    /// Adds a completed hole after validating it against the polygon.
    ///
    /// The hole must not self-intersect, must lie fully inside the
    /// boundary (and outside existing holes), and must not intersect any
    /// existing hole. On failure the hole list is left untouched.
    pub fn add_hole(&mut self, hole: Hole) -> Result<(), OlivineError> {
        if hole.is_self_intersecting() {
            return Err(OlivineError::Geometry(
                "hole boundary self-intersects".to_string(),
            ));
        }

        if !self.is_hole_inside(&hole) {
            return Err(OlivineError::Geometry(
                "hole lies outside the polygon".to_string(),
            ));
        }

        if self.hole_intersects_existing(&hole) {
            return Err(OlivineError::Geometry(
                "hole intersects an existing hole".to_string(),
            ));
        }

        self.holes.push(hole);
        Ok(())
    }

    /// Removes the most recently added hole.
    pub fn remove_last_hole(&mut self) {
        self.holes.pop();
    }

    fn is_hole_inside(&self, hole: &Hole) -> bool {
        // Containment also rejects points inside existing holes, which
        // forbids nesting.
        if !hole.points().iter().all(|p| self.contains(*p)) {
            return false;
        }

        let boundary_edges = self.edges();
        hole.edges()
            .iter()
            .all(|he| !boundary_edges.iter().any(|be| be.intersects(he)))
    }

    fn hole_intersects_existing(&self, hole: &Hole) -> bool {
        let new_edges = hole.edges();

        self.holes.iter().any(|old| {
            old.edges().iter().any(|oe| {
                new_edges
                    .iter()
                    .any(|ne| ne.intersects(oe) && !ne.shares_endpoint(oe))
            })
        })
    }

    fn bounding_box(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.boundary.first()?;
        let mut bounds = (first.x, first.y, first.x, first.y);

        for p in &self.boundary {
            bounds.0 = bounds.0.min(p.x);
            bounds.1 = bounds.1.min(p.y);
            bounds.2 = bounds.2.max(p.x);
            bounds.3 = bounds.3.max(p.y);
        }

        Some(bounds)
    }

    /// Scatters up to `count` random interior points, each at least
    /// `min_distance` from every existing point, boundary edge, and hole
    /// edge. Gives up after 1000 consecutive rejected samples.
    pub fn scatter_points<R: Rng>(&mut self, count: usize, min_distance: f64, rng: &mut R) {
        let Some((min_x, min_y, max_x, max_y)) = self.bounding_box() else {
            return;
        };

        let mut placed = 0;
        let mut fails = 0;

        while placed < count {
            if fails > 1000 {
                break;
            }

            let candidate = Point::new(rng.gen_range(min_x..=max_x), rng.gen_range(min_y..=max_y));

            if !self.contains(candidate) {
                fails += 1;
                continue;
            }

            let clear_of_points = self
                .points()
                .iter()
                .all(|q| candidate.distance_to(*q) >= min_distance);
            let clear_of_edges = self
                .edges()
                .iter()
                .all(|e| e.distance_to_point(candidate) >= min_distance);
            let clear_of_holes = self
                .holes_edges()
                .iter()
                .all(|e| e.distance_to_point(candidate) >= min_distance);

            if clear_of_points && clear_of_edges && clear_of_holes {
                self.inner_points.push(candidate);
                placed += 1;
                fails = 0;
            } else {
                fails += 1;
            }
        }

        debug!("scattered {} of {} requested interior points", placed, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn square(size: i32) -> Polygon {
        Polygon::from_boundary(vec![
            Point::new(0, 0),
            Point::new(size, 0),
            Point::new(size, size),
            Point::new(0, size),
        ])
    }

    fn small_hole(x: i32, y: i32, size: i32) -> Hole {
        Hole::from_points(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
    }

    #[test]
    fn edges_wrap_around() {
        let poly = square(10);
        let edges = poly.edges();

        assert_eq!(edges.len(), 4);
        assert!(edges.contains(&Edge::new(Point::new(0, 10), Point::new(0, 0))));
    }

    #[test]
    fn contains_inside_and_outside() {
        let poly = square(10);

        assert!(poly.contains(Point::new(5, 5)));
        assert!(!poly.contains(Point::new(15, 5)));
        assert!(!poly.contains(Point::new(-1, 5)));
    }

    #[test]
    fn contains_excludes_hole_interior() {
        let mut poly = square(100);
        poly.add_hole(small_hole(40, 40, 20)).unwrap();

        assert!(poly.contains(Point::new(10, 10)));
        assert!(!poly.contains(Point::new(50, 50)));
    }

    #[test]
    fn bowtie_self_intersects() {
        let poly = Polygon::from_boundary(vec![
            Point::new(0, 0),
            Point::new(10, 10),
            Point::new(10, 0),
            Point::new(0, 10),
        ]);

        assert!(poly.is_self_intersecting());
        assert!(!square(10).is_self_intersecting());
    }

    #[test]
    fn winding_query_and_reverse() {
        let mut poly = square(10);
        let before = poly.is_clockwise();

        poly.reverse();
        assert_ne!(before, poly.is_clockwise());
    }

    #[test]
    fn hole_outside_polygon_is_rejected() {
        let mut poly = square(50);

        let err = poly.add_hole(small_hole(40, 40, 30)).unwrap_err();
        assert!(matches!(err, OlivineError::Geometry(_)));
        assert!(poly.holes().is_empty());
    }

    #[test]
    fn intersecting_holes_are_rejected() {
        let mut poly = square(100);
        poly.add_hole(small_hole(20, 20, 30)).unwrap();

        let err = poly.add_hole(small_hole(40, 20, 30)).unwrap_err();
        assert!(matches!(err, OlivineError::Geometry(_)));
        assert_eq!(poly.holes().len(), 1);
    }

    #[test]
    fn self_intersecting_hole_is_rejected() {
        let mut poly = square(100);
        let bowtie = Hole::from_points(vec![
            Point::new(20, 20),
            Point::new(40, 40),
            Point::new(40, 20),
            Point::new(20, 40),
        ]);

        assert!(poly.add_hole(bowtie).is_err());
        assert!(poly.holes().is_empty());
    }

    #[test]
    fn nested_hole_is_rejected() {
        let mut poly = square(100);
        poly.add_hole(small_hole(20, 20, 50)).unwrap();

        // fully inside the first hole
        assert!(poly.add_hole(small_hole(30, 30, 10)).is_err());
        assert_eq!(poly.holes().len(), 1);
    }

    #[test]
    fn remove_last_hole_pops_latest() {
        let mut poly = square(100);
        poly.add_hole(small_hole(10, 10, 10)).unwrap();
        poly.add_hole(small_hole(60, 60, 10)).unwrap();

        poly.remove_last_hole();
        assert_eq!(poly.holes().len(), 1);
        assert_eq!(poly.holes()[0].points()[0], Point::new(10, 10));
    }

    #[test]
    fn points_enumerates_boundary_inner_and_holes() {
        let mut poly = square(100);
        poly.add_inner_point(Point::new(50, 10));
        poly.add_hole(small_hole(40, 40, 20)).unwrap();

        let points = poly.points();
        assert_eq!(points.len(), 4 + 1 + 4);
        assert_eq!(poly.points_count(), points.len());
        assert_eq!(points[4], Point::new(50, 10));
    }

    #[test]
    fn scatter_respects_distance_and_containment() {
        let mut poly = square(200);
        poly.add_hole(small_hole(80, 80, 40)).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        poly.scatter_points(20, 15.0, &mut rng);

        assert!(!poly.inner_points().is_empty());

        for (i, p) in poly.inner_points().iter().enumerate() {
            assert!(poly.contains(*p));

            for e in poly.edges().iter().chain(poly.holes_edges().iter()) {
                assert!(e.distance_to_point(*p) >= 15.0);
            }
            for (j, q) in poly.inner_points().iter().enumerate() {
                if i != j {
                    assert!(p.distance_to(*q) >= 15.0);
                }
            }
        }
    }
}
