use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Write as FmtWrite;
use tracing::warn;

use crate::*;

/// Immutable flowchart topology. Regenerating a chart builds a new one.
#[derive(Debug, Clone)]
pub struct Diagram {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

/// Everything the drawing surface needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub orientation: Orientation,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<SceneNode>,
    pub connectors: Vec<Connector>,
    pub labels: Vec<PlacedLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub text: String,
    pub icon: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Diagram {
    /// Builds the graph model. Ids must be unique: the first node with a
    /// given id wins and later duplicates are dropped.
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut kept = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            match index.entry(node.id.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(kept.len());
                    kept.push(node);
                }
                Entry::Occupied(_) => {
                    warn!(id = %node.id, "dropping node with duplicate id");
                }
            }
        }

        Self { nodes: kept, index }
    }

    /// Parses a JSON definition: either `{"nodes": [...]}` or a bare array.
    pub fn parse(definition: &str) -> Result<Self, FlowError> {
        let value: Value = serde_json::from_str(definition.trim())?;
        let nodes = match value {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => map.remove("nodes").ok_or(FlowError::MissingNodes)?,
            _ => return Err(FlowError::MissingNodes),
        };

        let nodes: Vec<Node> = serde_json::from_value(nodes)?;
        if nodes.is_empty() {
            return Err(FlowError::Empty);
        }

        Ok(Self::new(nodes))
    }

    /// Parses the free-form text returned by the chart generator, which may
    /// wrap the JSON definition in prose or a fenced code block.
    pub fn from_model_response(content: &str) -> Result<Self, FlowError> {
        let payload = extract_json_payload(content).ok_or(FlowError::MissingPayload)?;
        Self::parse(payload)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every `(source, target)` pair whose target exists, in source order
    /// then connection order.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node)> + '_ {
        self.nodes.iter().flat_map(move |source| {
            source
                .connections
                .iter()
                .filter_map(move |target| self.node(target).map(|target| (source, target)))
        })
    }

    pub fn layout(&self, orientation: Orientation) -> Vec<PositionedNode> {
        layout(&self.nodes, orientation)
    }

    pub fn scene(&self, orientation: Orientation, shapes: impl ShapeLookup) -> Scene {
        Session::new(self, orientation, shapes).scene()
    }

    pub fn to_definition(&self) -> Result<String, FlowError> {
        #[derive(Serialize)]
        struct Definition<'a> {
            nodes: &'a [Node],
        }

        Ok(serde_json::to_string_pretty(&Definition { nodes: &self.nodes })?)
    }
}

impl SceneNode {
    pub fn from_positioned(placed: &PositionedNode) -> Self {
        Self {
            id: placed.node.id.clone(),
            kind: placed.node.kind,
            text: placed.node.text.clone(),
            icon: resolve_icon(&placed.node),
            x: placed.x,
            y: placed.y,
            width: placed.width,
            height: placed.height,
        }
    }
}

impl Scene {
    pub fn new(
        orientation: Orientation,
        nodes: Vec<SceneNode>,
        connectors: Vec<Connector>,
        labels: Vec<PlacedLabel>,
    ) -> Self {
        let base = orientation.canvas();
        let mut width = base.width;
        let mut height = base.height;

        for node in &nodes {
            width = width.max(node.x + node.width + CANVAS_MARGIN);
            height = height.max(node.y + node.height + CANVAS_MARGIN);
        }
        for label in &labels {
            width = width.max(label.x + LABEL_HIT_WIDTH / 2.0 + CANVAS_MARGIN);
            height = height.max(label.y + LABEL_HIT_HEIGHT / 2.0 + CANVAS_MARGIN);
        }

        Self {
            orientation,
            width,
            height,
            nodes,
            connectors,
            labels,
        }
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn connector(&self, source: &str, target: &str) -> Option<&Connector> {
        self.connectors
            .iter()
            .find(|connector| connector.source == source && connector.target == target)
    }

    pub fn label(&self, source: &str, target: &str) -> Option<&PlacedLabel> {
        self.labels
            .iter()
            .find(|label| label.source == source && label.target == target)
    }

    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_svg(&self, theme: Theme, background: &str) -> Result<String> {
        let connector_style = theme.connector_style();

        let mut svg = String::new();
        write!(
            svg,
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="{}">
  <defs>
        <marker id="arrow-end" markerWidth="8" markerHeight="8" refX="6" refY="4" orient="auto" markerUnits="strokeWidth">
            <path d="M1,1 L6,4 L1,7 z" fill="context-stroke" />
        </marker>
  </defs>
  <rect width="100%" height="100%" fill="{}" />
"##,
            self.width,
            self.height,
            self.width,
            self.height,
            escape_xml(theme.font()),
            escape_xml(background)
        )?;

        let dash_attr = if connector_style.line == ConnectorLine::Dashed {
            " stroke-dasharray=\"8 6\""
        } else {
            ""
        };

        for connector in &self.connectors {
            write!(
                svg,
                "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"{:.1}\" marker-end=\"url(#arrow-end)\"{} />\n",
                connector.start.x,
                connector.start.y,
                connector.end.x,
                connector.end.y,
                connector_style.color,
                connector_style.thickness,
                dash_attr
            )?;
        }

        for node in &self.nodes {
            let style = theme.node_style(node.kind);
            let center_x = node.x + node.width / 2.0;
            let center_y = node.y + node.height / 2.0;

            match style.shape {
                NodeShape::Diamond => {
                    let half_w = node.width / 2.0;
                    let half_h = node.height / 2.0;
                    write!(
                        svg,
                        "  <polygon points=\"{:.1},{:.1} {:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\" />\n",
                        center_x,
                        center_y - half_h,
                        center_x + half_w,
                        center_y,
                        center_x,
                        center_y + half_h,
                        center_x - half_w,
                        center_y,
                        style.fill,
                        connector_style.color
                    )?;
                }
                shape => {
                    let radius = match shape {
                        NodeShape::Rectangle => 2.0,
                        NodeShape::Pill => node.height / 2.0,
                        _ => 8.0,
                    };
                    write!(
                        svg,
                        "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" rx=\"{:.1}\" ry=\"{:.1}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\" />\n",
                        node.x,
                        node.y,
                        node.width,
                        node.height,
                        radius,
                        radius,
                        style.fill,
                        connector_style.color
                    )?;
                }
            }

            write!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-size=\"13\" text-anchor=\"middle\" dominant-baseline=\"middle\" data-icon=\"{}\">{}</text>\n",
                center_x,
                center_y,
                style.text,
                escape_xml(&node.icon),
                escape_xml(&node.text)
            )?;
        }

        for label in &self.labels {
            let fill = if label.text == YES_LABEL {
                "#2F9E44"
            } else {
                "#E03131"
            };
            write!(
                svg,
                "  <g pointer-events=\"none\">\n    <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" rx=\"6\" ry=\"6\" fill=\"{}\" />\n    <text x=\"{:.1}\" y=\"{:.1}\" fill=\"#FFFFFF\" font-size=\"12\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>\n  </g>\n",
                label.x - LABEL_HIT_WIDTH / 2.0,
                label.y - LABEL_HIT_HEIGHT / 2.0,
                LABEL_HIT_WIDTH,
                LABEL_HIT_HEIGHT,
                fill,
                label.x,
                label.y,
                escape_xml(&label.text)
            )?;
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORT_FLOW: &str = r#"{
        "nodes": [
            {"id": "node1", "text": "Ticket received", "type": "start", "connections": ["node2"], "icon": "fa-inbox"},
            {"id": "node2", "text": "Known issue?", "type": "decision", "connections": ["node3", "node4"]},
            {"id": "node3", "text": "Send fix", "type": "process", "connections": ["node5"]},
            {"id": "node4", "text": "Escalate", "type": "process", "connections": ["node5", "missing"]},
            {"id": "node5", "text": "Close", "type": "end"}
        ]
    }"#;

    #[test]
    fn parses_wrapped_and_bare_definitions() {
        let wrapped = Diagram::parse(SUPPORT_FLOW).unwrap();
        assert_eq!(wrapped.nodes().len(), 5);
        assert_eq!(wrapped.node("node2").unwrap().kind, NodeKind::Decision);
        assert_eq!(wrapped.node("node5").unwrap().connections, Vec::<String>::new());

        let bare = Diagram::parse(r#"[{"id": "a", "type": "start"}]"#).unwrap();
        assert_eq!(bare.nodes().len(), 1);
        assert_eq!(bare.nodes()[0].text, "");
    }

    #[test]
    fn rejects_definitions_without_nodes() {
        assert!(matches!(Diagram::parse("{}"), Err(FlowError::MissingNodes)));
        assert!(matches!(Diagram::parse("42"), Err(FlowError::MissingNodes)));
        assert!(matches!(
            Diagram::parse(r#"{"nodes": []}"#),
            Err(FlowError::Empty)
        ));
        assert!(matches!(Diagram::parse("{nodes"), Err(FlowError::Json(_))));
        assert!(matches!(
            Diagram::parse(r#"[{"id": "a", "type": "subroutine"}]"#),
            Err(FlowError::Json(_))
        ));
    }

    #[test]
    fn duplicate_ids_keep_the_first_node() {
        let diagram = Diagram::new(vec![
            Node::new("a", NodeKind::Start).with_text("first"),
            Node::new("a", NodeKind::End).with_text("second"),
            Node::new("b", NodeKind::End),
        ]);

        assert_eq!(diagram.nodes().len(), 2);
        assert_eq!(diagram.node("a").unwrap().text, "first");
    }

    #[test]
    fn edges_skip_unknown_targets() {
        let diagram = Diagram::parse(SUPPORT_FLOW).unwrap();
        let edges: Vec<(&str, &str)> = diagram
            .edges()
            .map(|(source, target)| (source.id.as_str(), target.id.as_str()))
            .collect();

        assert_eq!(
            edges,
            vec![
                ("node1", "node2"),
                ("node2", "node3"),
                ("node2", "node4"),
                ("node3", "node5"),
                ("node4", "node5"),
            ]
        );
    }

    #[test]
    fn scene_contains_connectors_and_decision_labels() {
        let diagram = Diagram::parse(SUPPORT_FLOW).unwrap();
        let scene = diagram.scene(Orientation::Landscape, Theme::Modern);

        assert_eq!(scene.nodes.len(), 5);
        assert_eq!(scene.connectors.len(), 5);
        assert_eq!(scene.labels.len(), 2);
        assert_eq!(scene.label("node2", "node3").unwrap().text, "Yes");
        assert_eq!(scene.label("node2", "node4").unwrap().text, "No");
        assert_eq!(scene.node("node1").unwrap().icon, "fa-inbox");
        assert_eq!(scene.node("node3").unwrap().icon, "fa-cog");

        let yes = scene.connector("node2", "node3").unwrap();
        let label = scene.label("node2", "node3").unwrap();
        assert_eq!(label.x, yes.start.x + (yes.end.x - yes.start.x) * 0.5);
        assert_eq!(label.y, yes.start.y + (yes.end.y - yes.start.y) * 0.5);
    }

    #[test]
    fn canvas_grows_with_deep_layouts() {
        let mut nodes = Vec::new();
        for idx in 0..6 {
            let mut node = Node::new(format!("n{idx}"), NodeKind::Process);
            if idx < 5 {
                node = node.connect(format!("n{}", idx + 1));
            }
            nodes.push(node);
        }

        let scene = Diagram::new(nodes).scene(Orientation::Landscape, DefaultShapes);
        assert_eq!(scene.width, 900.0);
        // deepest node sits at y = 50 + 5 * 200
        assert_eq!(scene.height, 1050.0 + 80.0 + 50.0);
    }

    #[test]
    fn definition_round_trips_through_json() {
        let diagram = Diagram::parse(SUPPORT_FLOW).unwrap();
        let reparsed = Diagram::parse(&diagram.to_definition().unwrap()).unwrap();
        assert_eq!(reparsed.nodes(), diagram.nodes());
    }

    #[test]
    fn svg_draws_every_shape_and_label() {
        let diagram = Diagram::parse(SUPPORT_FLOW).unwrap();
        let scene = diagram.scene(Orientation::Portrait, Theme::Creative);
        let svg = scene.render_svg(Theme::Creative, "white").unwrap();

        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<polygon"), "decision should render as a diamond");
        assert_eq!(svg.matches("<line ").count(), 5);
        assert!(svg.contains("stroke-dasharray"), "creative theme uses dashed connectors");
        assert!(svg.contains(">Yes</text>"));
        assert!(svg.contains(">No</text>"));
        assert!(svg.contains("Known issue?"));
    }
}
