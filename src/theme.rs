use serde::{Deserialize, Serialize};

use crate::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Rectangle,
    Rounded,
    Diamond,
    #[serde(alias = "capsule")]
    Pill,
}

/// Maps a node type to the shape it is drawn with. Geometry only needs to
/// know whether a node is a diamond.
pub trait ShapeLookup {
    fn shape(&self, kind: NodeKind) -> NodeShape;
}

/// Shape table used when no theme is chosen.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShapes;

impl ShapeLookup for DefaultShapes {
    fn shape(&self, kind: NodeKind) -> NodeShape {
        match kind {
            NodeKind::Decision => NodeShape::Diamond,
            NodeKind::Start | NodeKind::Process | NodeKind::End => NodeShape::Rounded,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Modern,
    Corporate,
    Creative,
    Tech,
    Healthcare,
    Finance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub fill: &'static str,
    pub text: &'static str,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorLine {
    Straight,
    Dashed,
    Curved,
    Gradient,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorStyle {
    pub color: &'static str,
    pub line: ConnectorLine,
    pub thickness: f32,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Modern,
        Theme::Corporate,
        Theme::Creative,
        Theme::Tech,
        Theme::Healthcare,
        Theme::Finance,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Theme::Modern => "modern",
            Theme::Corporate => "corporate",
            Theme::Creative => "creative",
            Theme::Tech => "tech",
            Theme::Healthcare => "healthcare",
            Theme::Finance => "finance",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Modern => "Modern Minimal",
            Theme::Corporate => "Corporate Professional",
            Theme::Creative => "Creative Colorful",
            Theme::Tech => "Tech Blueprint",
            Theme::Healthcare => "Healthcare",
            Theme::Finance => "Finance & Banking",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|theme| theme.key().eq_ignore_ascii_case(key))
    }

    pub fn font(&self) -> &'static str {
        match self {
            Theme::Modern => "Roboto, sans-serif",
            Theme::Corporate => "Open Sans, sans-serif",
            Theme::Creative => "Comfortaa, cursive",
            Theme::Tech => "IBM Plex Sans, sans-serif",
            Theme::Healthcare => "Quicksand, sans-serif",
            Theme::Finance => "Montserrat, sans-serif",
        }
    }

    pub fn node_style(&self, kind: NodeKind) -> NodeStyle {
        use NodeKind::*;
        use NodeShape::*;

        let (fill, text, shape) = match (self, kind) {
            (Theme::Modern, Start) => ("#4361EE", "#FFFFFF", Rounded),
            (Theme::Modern, Process) => ("#F8F9FA", "#212529", Rounded),
            (Theme::Modern, Decision) => ("#FFF8E1", "#1C1C1C", Diamond),
            (Theme::Modern, End) => ("#4CC9F0", "#FFFFFF", Rounded),

            (Theme::Corporate, Start) => ("#2C3E50", "#FFFFFF", Rounded),
            (Theme::Corporate, Process) => ("#FFFFFF", "#34495E", Rectangle),
            (Theme::Corporate, Decision) => ("#ECF0F1", "#2C3E50", Diamond),
            (Theme::Corporate, End) => ("#3498DB", "#FFFFFF", Rounded),

            (Theme::Creative, Start) => ("#FF6B6B", "#FFFFFF", Pill),
            (Theme::Creative, Process) => ("#FFFFFF", "#2F2E41", Pill),
            (Theme::Creative, Decision) => ("#FFEAA7", "#2F2E41", Diamond),
            (Theme::Creative, End) => ("#4ECDC4", "#FFFFFF", Pill),

            (Theme::Tech, Start) => ("#3A0CA3", "#FFFFFF", Pill),
            (Theme::Tech, Process) => ("#0F1724", "#F8F9FA", Rectangle),
            (Theme::Tech, Decision) => ("#4895EF", "#FFFFFF", Diamond),
            (Theme::Tech, End) => ("#4CC9F0", "#FFFFFF", Pill),

            (Theme::Healthcare, Start) => ("#00B4D8", "#FFFFFF", Rounded),
            (Theme::Healthcare, Process) => ("#FFFFFF", "#023E8A", Rounded),
            (Theme::Healthcare, Decision) => ("#CAF0F8", "#023E8A", Diamond),
            (Theme::Healthcare, End) => ("#0077B6", "#FFFFFF", Rounded),

            (Theme::Finance, Start) => ("#1B4332", "#FFFFFF", Rectangle),
            (Theme::Finance, Process) => ("#FFFFFF", "#081C15", Rectangle),
            (Theme::Finance, Decision) => ("#D8F3DC", "#081C15", Diamond),
            (Theme::Finance, End) => ("#2D6A4F", "#FFFFFF", Rectangle),
        };

        NodeStyle { fill, text, shape }
    }

    pub fn connector_style(&self) -> ConnectorStyle {
        let (color, line, thickness) = match self {
            Theme::Modern => ("#CED4DA", ConnectorLine::Curved, 2.0),
            Theme::Corporate => ("#95A5A6", ConnectorLine::Straight, 2.0),
            Theme::Creative => ("#A5A6F6", ConnectorLine::Dashed, 3.0),
            Theme::Tech => ("#4361EE", ConnectorLine::Gradient, 2.0),
            Theme::Healthcare => ("#90E0EF", ConnectorLine::Straight, 2.0),
            Theme::Finance => ("#95D5B2", ConnectorLine::Straight, 2.0),
        };

        ConnectorStyle {
            color,
            line,
            thickness,
        }
    }
}

impl ShapeLookup for Theme {
    fn shape(&self, kind: NodeKind) -> NodeShape {
        self.node_style(kind).shape
    }
}

impl<T: ShapeLookup + ?Sized> ShapeLookup for &T {
    fn shape(&self, kind: NodeKind) -> NodeShape {
        (**self).shape(kind)
    }
}

pub fn default_icon(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Start => "fa-play-circle",
        NodeKind::Process => "fa-cog",
        NodeKind::Decision => "fa-question-circle",
        NodeKind::End => "fa-flag-checkered",
    }
}

/// Icon class for a node: the node's own icon with an `fa-` prefix, or the
/// default for its type.
pub fn resolve_icon(node: &Node) -> String {
    match node.icon.as_deref().map(str::trim) {
        Some(icon) if !icon.is_empty() => {
            if icon.starts_with("fa-") {
                icon.to_string()
            } else {
                format!("fa-{icon}")
            }
        }
        _ => default_icon(node.kind).to_string(),
    }
}
