use serde::Serialize;

use crate::{DEFAULT_LABEL_POSITION, Node, NodeKind, Point};

pub const YES_LABEL: &str = "Yes";
pub const NO_LABEL: &str = "No";

/// Branch annotation for the connector `source -> target_id`.
///
/// Only decision nodes carry labels. The first connection is the "Yes"
/// branch; every other connection is "No", including the third and later
/// branches of a decision with more than two outcomes.
pub fn branch_label(source: &Node, target_id: &str) -> Option<&'static str> {
    if source.kind != NodeKind::Decision {
        return None;
    }

    let is_first = source
        .connections
        .first()
        .is_some_and(|first| first == target_id);

    Some(if is_first { YES_LABEL } else { NO_LABEL })
}

/// A label glued to a decision connector. Only the interpolation parameter
/// is stored; its coordinates are re-derived from the connector every time.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub source: String,
    pub target: String,
    pub text: String,
    pub position: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub source: String,
    pub target: String,
    pub text: String,
    pub position: f32,
    pub x: f32,
    pub y: f32,
}

impl Label {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            text: text.into(),
            position: DEFAULT_LABEL_POSITION,
        }
    }

    pub fn for_branch(source: &Node, target_id: &str) -> Option<Self> {
        branch_label(source, target_id).map(|text| Label::new(&source.id, target_id, text))
    }

    pub fn anchor(&self, start: Point, end: Point) -> Point {
        Point {
            x: start.x + (end.x - start.x) * self.position,
            y: start.y + (end.y - start.y) * self.position,
        }
    }

    pub fn drag_to(&mut self, start: Point, end: Point, cursor: Point) -> Point {
        self.position = project_onto_segment(start, end, cursor);
        self.anchor(start, end)
    }

    pub fn reset(&mut self) {
        self.position = DEFAULT_LABEL_POSITION;
    }

    pub fn placed(&self, start: Point, end: Point) -> PlacedLabel {
        let anchor = self.anchor(start, end);
        PlacedLabel {
            source: self.source.clone(),
            target: self.target.clone(),
            text: self.text.clone(),
            position: self.position,
            x: anchor.x,
            y: anchor.y,
        }
    }
}

/// Scalar projection of `cursor` onto the segment `start -> end`, clamped to
/// `[0, 1]`. A zero-length segment has no direction, so the label sits in
/// the middle.
pub fn project_onto_segment(start: Point, end: Point, cursor: Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f32::EPSILON {
        return DEFAULT_LABEL_POSITION;
    }

    let t = ((cursor.x - start.x) * dx + (cursor.y - start.y) * dy) / length_sq;
    t.clamp(0.0, 1.0)
}
