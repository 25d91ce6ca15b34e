// src/geometry.rs
//
// Pure geometric predicates shared by the monitors. These must keep the
// exact boundary behavior of the reference pipeline, including the
// half-open interval test in the ray caster.

use crate::types::{BBox, Point};

/// Ray-casting point-in-polygon test.
///
/// A polygon with fewer than 3 vertices contains nothing. A point lying on
/// a horizontal edge is outside (the `y` comparison is half-open); a point
/// on a vertical edge may count as inside.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];

        let crosses = (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Euclidean distance between two points, in pixels.
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    (dx * dx + dy * dy).sqrt()
}

/// Center of a bounding box.
pub fn bbox_center(bbox: BBox) -> Point {
    Point {
        x: (bbox[0] + bbox[2]) / 2.0,
        y: (bbox[1] + bbox[3]) / 2.0,
    }
}

/// Bottom-edge midpoint of a bounding box (feet position for a person).
pub fn bbox_bottom_center(bbox: BBox) -> Point {
    Point {
        x: (bbox[0] + bbox[2]) / 2.0,
        y: bbox[3],
    }
}

/// Whether two boxes overlap with positive area. Boxes that only share an
/// edge do not overlap.
pub fn bboxes_overlap(b1: BBox, b2: BBox) -> bool {
    !(b1[2] <= b2[0] // b1 left of b2
        || b1[0] >= b2[2] // b1 right of b2
        || b1[3] <= b2[1] // b1 above b2
        || b1[1] >= b2[3]) // b1 below b2
}

/// Intersection over union of two boxes. Degenerate intersections and a
/// zero-area union both yield 0, never NaN.
pub fn iou(b1: BBox, b2: BBox) -> f64 {
    let x1 = b1[0].max(b2[0]);
    let y1 = b1[1].max(b2[1]);
    let x2 = b1[2].min(b2[2]);
    let y2 = b1[3].min(b2[3]);

    if x2 < x1 || y2 < y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area1 = (b1[2] - b1[0]) * (b1[3] - b1[1]);
    let area2 = (b2[2] - b2[0]) * (b2[3] - b2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
