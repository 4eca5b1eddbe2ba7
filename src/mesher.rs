//! Constrained Delaunay triangulation of a polygon with holes.
//!
//! Three ordered phases: incremental Bowyer-Watson construction over every
//! mesh point, recovery of the polygon and hole boundary edges by diagonal
//! flips, then trimming of triangles outside the boundary or filling a
//! hole cavity.
//!
//! Predicates run in f64 on the integer input coordinates with no epsilon.
//! Vertex and edge identity use exact integer equality, which is sound for
//! integer inputs, but near-collinear or near-cocircular configurations can
//! still misclassify. Known limitation.

use std::time::Instant;

use log::{debug, info};
use nalgebra::Matrix3;

use crate::error::OlivineError;
use crate::geometry::{Edge, Point, Triangle};
use crate::polygon::Polygon;

/// Half-span of the Bowyer-Watson super-triangle. Input coordinates must
/// lie well inside this range.
pub const SUPER_TRIANGLE_SPAN: i32 = 10_000;

/// Triangulates the polygon into a constrained Delaunay mesh.
///
/// # Arguments
/// * `polygon` - The body to mesh: boundary, interior points, and holes
///
/// # Returns
/// The triangles covering the polygon interior, minus hole cavities.
pub fn triangulate(polygon: &Polygon) -> Result<Vec<Triangle>, OlivineError> {
    if polygon.boundary().len() < 3 {
        return Err(OlivineError::Geometry(
            "boundary needs at least 3 points".to_string(),
        ));
    }

    if polygon.is_self_intersecting() {
        return Err(OlivineError::Geometry(
            "polygon boundary self-intersects".to_string(),
        ));
    }

    // The trimming rules assume a counter-clockwise boundary and clockwise
    // holes; normalize a working copy instead of trusting the caller.
    let mut poly = polygon.clone();
    poly.normalize_windings();

    let start = Instant::now();
    let points = poly.points();

    let mut triangles = bowyer_watson(&points);
    debug!("hull triangulation holds {} triangles", triangles.len());

    insert_polygon_boundary(&mut triangles, &poly);
    debug!("boundary recovery left {} triangles", triangles.len());

    trim_outside(&mut triangles, &poly);

    info!(
        "triangulated {} points into {} triangles in {:.3} seconds",
        points.len(),
        triangles.len(),
        start.elapsed().as_secs_f32()
    );

    Ok(triangles)
}

/// Re-orients a triangle to counter-clockwise in the raw frame, the
/// winding the circumcircle predicate expects.
fn oriented(mut t: Triangle) -> Triangle {
    if t.is_clockwise() {
        t.reverse();
    }

    t
}

/// Incremental Bowyer-Watson triangulation of the point set.
///
/// Seeds with a super-triangle enclosing any realistic input, inserts the
/// points one at a time by re-triangulating the corrupted cavity, and
/// finally drops everything still attached to the super-triangle vertices.
fn bowyer_watson(points: &[Point]) -> Vec<Triangle> {
    let right_down = Point::new(SUPER_TRIANGLE_SPAN, -SUPER_TRIANGLE_SPAN);
    let left_down = Point::new(-SUPER_TRIANGLE_SPAN, -SUPER_TRIANGLE_SPAN);
    let center_top = Point::new(0, SUPER_TRIANGLE_SPAN);

    let mut triangles = vec![Triangle::new(center_top, left_down, right_down)];

    for &p in points {
        // Triangles whose circumcircle strictly contains the new point.
        let corrupted: Vec<Triangle> = triangles
            .iter()
            .filter(|t| in_circumcircle(p, t))
            .copied()
            .collect();

        let cavity = region_boundary(&corrupted);

        triangles.retain(|t| !corrupted.contains(t));

        // Re-triangulate the cavity against the new point.
        for e in cavity {
            triangles.push(oriented(Triangle::new(e.start, e.end, p)));
        }
    }

    triangles.retain(|t| {
        !t.points().contains(&right_down)
            && !t.points().contains(&left_down)
            && !t.points().contains(&center_top)
    });

    triangles
}

/// Whether `p` lies strictly inside the circumcircle of `tri`.
///
/// Translates the vertices relative to `p` and takes the determinant of
/// the rows [dx, dy, dx^2 + dy^2]; strictly positive means inside. The
/// sign convention requires counter-clockwise vertex order in the raw
/// frame, which the construction maintains.
fn in_circumcircle(p: Point, tri: &Triangle) -> bool {
    let pa = tri[0] - p;
    let pb = tri[1] - p;
    let pc = tri[2] - p;

    let det = Matrix3::new(
        pa.x as f64,
        pa.y as f64,
        (pa.x * pa.x + pa.y * pa.y) as f64,
        pb.x as f64,
        pb.y as f64,
        (pb.x * pb.x + pb.y * pb.y) as f64,
        pc.x as f64,
        pc.y as f64,
        (pc.x * pc.x + pc.y * pc.y) as f64,
    )
    .determinant();

    det > 0.0
}

/// Boundary of the corrupted region: edges owned by exactly one corrupted
/// triangle. Edges shared by two corrupted triangles are interior to the
/// cavity.
fn region_boundary(corrupted: &[Triangle]) -> Vec<Edge> {
    let mut boundary = Vec::new();

    for (i, t) in corrupted.iter().enumerate() {
        for e in t.edges() {
            let shared = corrupted
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.edges().contains(&e));

            if !shared {
                boundary.push(e);
            }
        }
    }

    boundary
}

/// Forces the polygon boundary, then each hole boundary, into the
/// triangulation.
fn insert_polygon_boundary(triangles: &mut Vec<Triangle>, poly: &Polygon) {
    insert_boundary(triangles, &poly.edges());

    for hole in poly.holes() {
        insert_boundary(triangles, &hole.edges());
    }
}

/// Recovers one boundary's required edges, then removes slivers left
/// crossing them.
fn insert_boundary(triangles: &mut Vec<Triangle>, required: &[Edge]) {
    let missing: Vec<Edge> = required
        .iter()
        .filter(|re| !triangles.iter().any(|t| t.edges().contains(*re)))
        .copied()
        .collect();

    if !missing.is_empty() {
        debug!("recovering {} missing constrained edges", missing.len());
    }

    for e in &missing {
        insert_edge(triangles, *e);
    }

    trim_crossing_slivers(triangles, required);
}

/// Inserts one required edge by flipping the diagonal of every
/// quadrilateral formed around an edge crossing it.
fn insert_edge(triangles: &mut Vec<Triangle>, edge: Edge) {
    for crossing in crossing_edges(triangles, edge) {
        // The pair of triangles sharing the crossing edge form a
        // quadrilateral; a mesh-border edge with a single owner is skipped.
        let pair: Vec<usize> = triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.edges().contains(&crossing))
            .map(|(i, _)| i)
            .take(2)
            .collect();

        if pair.len() < 2 {
            continue;
        }

        let first = oriented(Triangle::new(edge.start, edge.end, crossing.start));
        let second = oriented(Triangle::new(edge.start, edge.end, crossing.end));

        // Higher index first, so the lower index stays valid.
        triangles.remove(pair[1]);
        triangles.remove(pair[0]);
        triangles.push(first);
        triangles.push(second);
    }
}

/// Every triangulation edge that geometrically crosses `edge`, excluding
/// edges sharing an endpoint with it, deduplicated.
fn crossing_edges(triangles: &[Triangle], edge: Edge) -> Vec<Edge> {
    let mut crossing: Vec<Edge> = Vec::new();

    for t in triangles {
        for e in t.edges() {
            if edge.intersects(&e) && !crossing.contains(&e) && !edge.shares_endpoint(&e) {
                crossing.push(e);
            }
        }
    }

    crossing
}

/// Removes the leftovers of the flipping process: a triangle dies when
/// some required edge is not among its own edges yet one of its edges
/// crosses it. Owning one required edge does not excuse crossing another.
fn trim_crossing_slivers(triangles: &mut Vec<Triangle>, required: &[Edge]) {
    triangles.retain(|t| {
        let edges = t.edges();

        !required.iter().any(|re| {
            edges.iter().all(|e| e != re)
                && edges
                    .iter()
                    .any(|e| e.intersects(re) && !e.shares_endpoint(re))
        })
    });
}

/// Trims triangles outside the polygon boundary, then triangles filling
/// each hole cavity.
fn trim_outside(triangles: &mut Vec<Triangle>, poly: &Polygon) {
    trim_ring(triangles, poly.boundary());

    for hole in poly.holes() {
        trim_ring(triangles, hole.points());
    }
}

/// Drops every triangle whose three vertices all lie on the ring and read
/// clockwise (screen frame) when collected in ring traversal order.
///
/// Against the normalized counter-clockwise boundary that removes
/// triangles outside it; against a clockwise hole ring it removes the
/// triangles filling the cavity. Triangles touching a ring at fewer than
/// three vertices are never candidates.
fn trim_ring(triangles: &mut Vec<Triangle>, ring: &[Point]) {
    triangles.retain(|t| {
        let mut matched: Vec<Point> = Vec::with_capacity(3);

        for p in ring {
            if *p == t[0] || *p == t[1] || *p == t[2] {
                matched.push(*p);

                if matched.len() == 3 {
                    break;
                }
            }
        }

        if matched.len() < 3 {
            return true;
        }

        !Triangle::points_clockwise(&[matched[0], matched[1], matched[2]])
    });
}
