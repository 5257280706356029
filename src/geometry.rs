use serde::Serialize;

use crate::{DefaultShapes, NodeShape, Point, PositionedNode, ShapeLookup};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn centered(center: Point, width: f32, height: f32) -> Rect {
        Rect {
            min_x: center.x - width / 2.0,
            max_x: center.x + width / 2.0,
            min_y: center.y - height / 2.0,
            max_y: center.y + height / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let eps = 1e-3_f32;
        point.x >= self.min_x - eps
            && point.x <= self.max_x + eps
            && point.y >= self.min_y - eps
            && point.y <= self.max_y + eps
    }
}

/// A straight connector between two positioned nodes, ready to draw.
///
/// Always derived from the current node positions; it is never the source of
/// truth for where a connector goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
    pub id: String,
    pub source: String,
    pub target: String,
    pub start: Point,
    pub end: Point,
    /// Rotation of the connector in degrees, clockwise from the +x axis.
    pub angle: f32,
    pub length: f32,
}

impl Connector {
    pub fn between(
        source: &PositionedNode,
        target: &PositionedNode,
        shapes: &impl ShapeLookup,
    ) -> Self {
        let (start, end) = connector_endpoints(
            source,
            shapes.shape(source.kind()),
            target,
            shapes.shape(target.kind()),
        );

        Connector {
            id: edge_identifier(source.id(), target.id()),
            source: source.id().to_string(),
            target: target.id().to_string(),
            start,
            end,
            angle: angle_degrees(start, end),
            length: segment_length(start, end),
        }
    }

    /// Point at `t` in `[0, 1]` along the connector, from source to target.
    pub fn point_at(&self, t: f32) -> Point {
        Point {
            x: self.start.x + (self.end.x - self.start.x) * t,
            y: self.start.y + (self.end.y - self.start.y) * t,
        }
    }
}

pub fn edge_identifier(source: &str, target: &str) -> String {
    format!("{source} --> {target}")
}

/// Border points using the default shape table, where decision nodes are
/// diamonds.
pub fn border_points(source: &PositionedNode, target: &PositionedNode) -> (Point, Point) {
    connector_endpoints(
        source,
        DefaultShapes.shape(source.kind()),
        target,
        DefaultShapes.shape(target.kind()),
    )
}

/// Where a straight connector leaves `source` and enters `target`.
///
/// Diamonds are only connected through their vertices: flow exits a diamond
/// at its bottom vertex and enters one at its top vertex.
pub fn connector_endpoints(
    source: &PositionedNode,
    source_shape: NodeShape,
    target: &PositionedNode,
    target_shape: NodeShape,
) -> (Point, Point) {
    let source_center = source.center();
    let target_center = target.center();

    let start = if source_shape == NodeShape::Diamond {
        Point {
            x: source_center.x,
            y: source_center.y + source.height / 2.0,
        }
    } else {
        border_intersection(source_center, target_center, source)
    };

    let end = if target_shape == NodeShape::Diamond {
        Point {
            x: target_center.x,
            y: target_center.y - target.height / 2.0,
        }
    } else {
        border_intersection(target_center, source_center, target)
    };

    (start, end)
}

fn border_intersection(from: Point, toward: Point, node: &PositionedNode) -> Point {
    let angle = (toward.y - from.y).atan2(toward.x - from.x);
    let (sin, cos) = angle.sin_cos();
    let rect = node.rect();

    if cos.abs() > sin.abs() {
        let x = if cos > 0.0 { rect.max_x } else { rect.min_x };
        let y = from.y + (x - from.x) * sin / cos;
        Point {
            x,
            y: y.clamp(rect.min_y, rect.max_y),
        }
    } else {
        let y = if sin > 0.0 { rect.max_y } else { rect.min_y };
        let x = from.x + (y - from.y) * cos / sin;
        Point {
            x: x.clamp(rect.min_x, rect.max_x),
            y,
        }
    }
}

pub fn angle_degrees(start: Point, end: Point) -> f32 {
    (end.y - start.y).atan2(end.x - start.x).to_degrees()
}

pub fn segment_length(start: Point, end: Point) -> f32 {
    (end.x - start.x).hypot(end.y - start.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, NodeKind};

    fn placed(id: &str, kind: NodeKind, x: f32, y: f32) -> PositionedNode {
        PositionedNode::new(Node::new(id, kind), x, y)
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn horizontal_neighbours_meet_on_facing_sides() {
        let left = placed("a", NodeKind::Process, 0.0, 100.0);
        let right = placed("b", NodeKind::Process, 400.0, 100.0);

        let (start, end) = border_points(&left, &right);
        assert_close(start.x, 120.0);
        assert_close(start.y, 140.0);
        assert_close(end.x, 400.0);
        assert_close(end.y, 140.0);

        let (start, end) = border_points(&right, &left);
        assert_close(start.x, 400.0);
        assert_close(end.x, 120.0);
        assert_close(start.y, end.y);
    }

    #[test]
    fn vertical_neighbours_meet_on_top_and_bottom() {
        let upper = placed("a", NodeKind::Start, 50.0, 50.0);
        let lower = placed("b", NodeKind::End, 50.0, 250.0);

        let (start, end) = border_points(&upper, &lower);
        assert_close(start.x, 110.0);
        assert_close(start.y, 130.0);
        assert_close(end.x, 110.0);
        assert_close(end.y, 250.0);
    }

    #[test]
    fn steep_diagonal_stays_on_the_border() {
        // 40 degrees: left/right side is chosen but the projected crossing
        // would fall below the node, so it is clamped to the corner.
        let source = placed("a", NodeKind::Process, 0.0, 0.0);
        let dx = 300.0_f32;
        let dy = dx * 40.0_f32.to_radians().tan();
        let target = placed("b", NodeKind::Process, dx, dy);

        let (start, _) = border_points(&source, &target);
        assert_close(start.x, 120.0);
        assert_close(start.y, 80.0);
        assert!(source.rect().contains(start));
    }

    #[test]
    fn shallow_diagonal_uses_exact_intersection() {
        let source = placed("a", NodeKind::Process, 0.0, 0.0);
        let target = placed("b", NodeKind::Process, 300.0, 60.0);

        let (start, end) = border_points(&source, &target);
        // slope 60 / 300 from the centre (60, 40)
        assert_close(start.x, 120.0);
        assert_close(start.y, 40.0 + 60.0 * 0.2);
        assert_close(end.x, 300.0);
        assert_close(end.y, 100.0 - 60.0 * 0.2);
    }

    #[test]
    fn decision_source_exits_bottom_vertex() {
        let decision = placed("d", NodeKind::Decision, 200.0, 200.0);
        for (x, y) in [(600.0, 200.0), (-300.0, 210.0), (200.0, -400.0), (210.0, 600.0)] {
            let target = placed("t", NodeKind::Process, x, y);
            let (start, _) = border_points(&decision, &target);
            assert_eq!(start, Point::new(260.0, 280.0));
        }
    }

    #[test]
    fn decision_target_is_entered_at_top_vertex() {
        let source = placed("s", NodeKind::Process, 700.0, 240.0);
        let decision = placed("d", NodeKind::Decision, 200.0, 200.0);
        let (_, end) = border_points(&source, &decision);
        assert_eq!(end, Point::new(260.0, 200.0));
    }

    #[test]
    fn theme_shape_decides_the_diamond_override() {
        struct AllDiamonds;
        impl ShapeLookup for AllDiamonds {
            fn shape(&self, _kind: NodeKind) -> NodeShape {
                NodeShape::Diamond
            }
        }

        let source = placed("a", NodeKind::Process, 0.0, 0.0);
        let target = placed("b", NodeKind::Process, 400.0, 0.0);
        let connector = Connector::between(&source, &target, &AllDiamonds);
        assert_eq!(connector.start, Point::new(60.0, 80.0));
        assert_eq!(connector.end, Point::new(460.0, 0.0));
    }

    #[test]
    fn connector_carries_angle_and_length() {
        let source = placed("a", NodeKind::Start, 0.0, 0.0);
        let target = placed("b", NodeKind::End, 0.0, 300.0);
        let connector = Connector::between(&source, &target, &DefaultShapes);

        assert_eq!(connector.id, "a --> b");
        assert_close(connector.angle, 90.0);
        assert_close(connector.length, 220.0);
        let middle = connector.point_at(0.5);
        assert_close(middle.x, 60.0);
        assert_close(middle.y, 190.0);
    }

    #[test]
    fn coincident_nodes_do_not_produce_nan() {
        let a = placed("a", NodeKind::Process, 10.0, 10.0);
        let b = placed("b", NodeKind::Process, 10.0, 10.0);
        let connector = Connector::between(&a, &b, &DefaultShapes);
        assert!(connector.start.x.is_finite() && connector.start.y.is_finite());
        assert!(connector.end.x.is_finite() && connector.end.y.is_finite());
        assert!(connector.angle.is_finite());
    }
}
