use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod diagram;
pub mod geometry;
pub mod interaction;
pub mod label;
pub mod layout;
pub mod theme;
pub mod utils;

pub use diagram::*;
pub use geometry::*;
pub use interaction::*;
pub use label::*;
pub use layout::*;
pub use theme::*;
pub use utils::*;

pub const NODE_WIDTH: f32 = 120.0;
pub const NODE_HEIGHT: f32 = 80.0;
pub const START_OFFSET: f32 = 50.0;
pub const SLOT_CENTER_OFFSET: f32 = 60.0;
pub const LANDSCAPE_SPAN: f32 = 1000.0;
pub const PORTRAIT_SPAN: f32 = 800.0;
pub const LEVEL_HEIGHT: f32 = 200.0;
pub const LEVEL_WIDTH: f32 = 300.0;
pub const LANDSCAPE_CANVAS_WIDTH: f32 = 900.0;
pub const LANDSCAPE_CANVAS_HEIGHT: f32 = 650.0;
pub const CANVAS_MARGIN: f32 = 50.0;
pub const DEFAULT_LABEL_POSITION: f32 = 0.5;
pub const LABEL_HIT_WIDTH: f32 = 36.0;
pub const LABEL_HIT_HEIGHT: f32 = 28.0;
pub const ZOOM_STEP: f32 = 0.1;
pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;
pub const PAN_STEP: f32 = 50.0;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flowchart definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("flowchart definition must be a 'nodes' array or an object containing one")]
    MissingNodes,
    #[error("flowchart does not declare any nodes")]
    Empty,
    #[error("no flowchart JSON found in the generated text")]
    MissingPayload,
    #[error("unknown node '{0}'")]
    UnknownNode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Process,
    Decision,
    End,
}

/// A flowchart vertex as delivered by the graph generator.
///
/// `connections` is ordered: for decision nodes the first entry is the
/// "Yes" branch and every later entry is a "No" branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

/// A node with its layout coordinates. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    #[serde(flatten)]
    pub node: Node,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            text: id.clone(),
            id,
            kind,
            connections: Vec::new(),
            icon: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn connect(mut self, target: impl Into<String>) -> Self {
        self.connections.push(target.into());
        self
    }
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::End => "end",
        }
    }
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }

    /// Base drawing surface before it grows to fit the content.
    pub fn canvas(&self) -> CanvasSize {
        match self {
            Orientation::Landscape => CanvasSize {
                width: LANDSCAPE_CANVAS_WIDTH,
                height: LANDSCAPE_CANVAS_HEIGHT,
            },
            Orientation::Portrait => CanvasSize {
                width: LANDSCAPE_CANVAS_HEIGHT,
                height: LANDSCAPE_CANVAS_WIDTH,
            },
        }
    }
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl PositionedNode {
    pub fn new(node: Node, x: f32, y: f32) -> Self {
        Self {
            node,
            x,
            y,
            width: NODE_WIDTH,
            height: NODE_HEIGHT,
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }

    pub fn origin(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect {
            min_x: self.x,
            max_x: self.x + self.width,
            min_y: self.y,
            max_y: self.y + self.height,
        }
    }
}
