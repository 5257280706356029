use std::collections::HashMap;

use tracing::trace;

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMode {
    Idle,
    /// `grab` is the cursor offset from the node's top-left corner at press time.
    DraggingNode { node: usize, grab: Point },
    DraggingLabel { label: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Zoom and pan applied to the drawing surface as `scale(s) translate(pan)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Point::default(),
        }
    }
}

impl Viewport {
    pub fn zoom_in(&mut self) {
        if self.scale < MAX_ZOOM {
            self.scale = (self.scale + ZOOM_STEP).min(MAX_ZOOM);
        }
    }

    pub fn zoom_out(&mut self) {
        if self.scale > MIN_ZOOM {
            self.scale = (self.scale - ZOOM_STEP).max(MIN_ZOOM);
        }
    }

    pub fn reset_zoom(&mut self) {
        self.scale = 1.0;
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    /// Moves the view one step; the content shifts the opposite way.
    pub fn pan_step(&mut self, direction: PanDirection) {
        match direction {
            PanDirection::Up => self.pan_by(0.0, PAN_STEP),
            PanDirection::Down => self.pan_by(0.0, -PAN_STEP),
            PanDirection::Left => self.pan_by(PAN_STEP, 0.0),
            PanDirection::Right => self.pan_by(-PAN_STEP, 0.0),
        }
    }

    pub fn reset_position(&mut self) {
        self.pan = Point::default();
    }

    pub fn to_diagram(&self, screen: Point) -> Point {
        Point {
            x: screen.x / self.scale - self.pan.x,
            y: screen.y / self.scale - self.pan.y,
        }
    }

    pub fn to_screen(&self, point: Point) -> Point {
        Point {
            x: (point.x + self.pan.x) * self.scale,
            y: (point.y + self.pan.y) * self.scale,
        }
    }
}

/// Connectors and labels whose geometry changed in response to one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Refresh {
    pub connectors: Vec<Connector>,
    pub labels: Vec<PlacedLabel>,
}

impl Refresh {
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty() && self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeSlot {
    source: usize,
    target: usize,
    label: Option<usize>,
}

/// Interactive state for one rendered diagram.
///
/// Node positions and label parameters are the only mutable state; every
/// connector is recomputed from them on demand. Independent diagrams need
/// independent sessions.
#[derive(Debug, Clone)]
pub struct Session<S = Theme> {
    orientation: Orientation,
    shapes: S,
    nodes: Vec<PositionedNode>,
    index: HashMap<String, usize>,
    initial: Vec<Point>,
    edges: Vec<EdgeSlot>,
    labels: Vec<Label>,
    mode: DragMode,
    viewport: Viewport,
}

impl<S: ShapeLookup> Session<S> {
    pub fn new(diagram: &Diagram, orientation: Orientation, shapes: S) -> Self {
        let nodes = diagram.layout(orientation);
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, placed)| (placed.id().to_string(), idx))
            .collect();
        let initial = nodes.iter().map(PositionedNode::origin).collect();

        let mut edges = Vec::new();
        let mut labels = Vec::new();
        for (source, placed) in nodes.iter().enumerate() {
            for target_id in &placed.node.connections {
                let Some(&target) = index.get(target_id) else {
                    continue;
                };

                let label = Label::for_branch(&placed.node, target_id).map(|label| {
                    labels.push(label);
                    labels.len() - 1
                });
                edges.push(EdgeSlot {
                    source,
                    target,
                    label,
                });
            }
        }

        Self {
            orientation,
            shapes,
            nodes,
            index,
            initial,
            edges,
            labels,
            mode: DragMode::Idle,
            viewport: Viewport::default(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn nodes(&self) -> &[PositionedNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn connectors(&self) -> Vec<Connector> {
        self.edges.iter().map(|edge| self.connector_for(edge)).collect()
    }

    pub fn connector(&self, source: &str, target: &str) -> Option<Connector> {
        let source = *self.index.get(source)?;
        let target = *self.index.get(target)?;
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
            .map(|edge| self.connector_for(edge))
    }

    pub fn placed_labels(&self) -> Vec<PlacedLabel> {
        self.edges
            .iter()
            .filter_map(|edge| self.placed_label_for(edge))
            .collect()
    }

    pub fn label(&self, source: &str, target: &str) -> Option<PlacedLabel> {
        let source = *self.index.get(source)?;
        let target = *self.index.get(target)?;
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
            .and_then(|edge| self.placed_label_for(edge))
    }

    pub fn scene(&self) -> Scene {
        Scene::new(
            self.orientation,
            self.nodes.iter().map(SceneNode::from_positioned).collect(),
            self.connectors(),
            self.placed_labels(),
        )
    }

    /// Starts a drag at `screen`. Labels win over nodes when both are hit.
    /// A press while a drag is already active is ignored.
    pub fn pointer_down(&mut self, screen: Point) -> DragMode {
        if self.mode != DragMode::Idle {
            return self.mode;
        }

        let cursor = self.viewport.to_diagram(screen);
        if let Some(label) = self.label_at(cursor) {
            trace!(label, "label drag started");
            self.mode = DragMode::DraggingLabel { label };
        } else if let Some(node) = self.node_at(cursor) {
            let origin = self.nodes[node].origin();
            let grab = Point {
                x: cursor.x - origin.x,
                y: cursor.y - origin.y,
            };
            trace!(node = %self.nodes[node].id(), "node drag started");
            self.mode = DragMode::DraggingNode { node, grab };
        }

        self.mode
    }

    pub fn pointer_move(&mut self, screen: Point) -> Refresh {
        let cursor = self.viewport.to_diagram(screen);
        match self.mode {
            DragMode::Idle => Refresh::default(),
            DragMode::DraggingNode { node, grab } => {
                let origin = Point {
                    x: cursor.x - grab.x,
                    y: cursor.y - grab.y,
                };
                self.place(node, origin)
            }
            DragMode::DraggingLabel { label } => self.drag_label(label, cursor),
        }
    }

    pub fn pointer_up(&mut self) {
        if self.mode != DragMode::Idle {
            trace!("drag finished");
        }
        self.mode = DragMode::Idle;
    }

    /// Moves a node's top-left corner to `origin` in diagram coordinates.
    pub fn move_node(&mut self, id: &str, origin: Point) -> Result<Refresh, FlowError> {
        let node = *self
            .index
            .get(id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_string()))?;
        Ok(self.place(node, origin))
    }

    /// Restores the positions captured right after layout, recentres every
    /// label and resets zoom and pan.
    pub fn reset_layout(&mut self) -> Refresh {
        for (placed, origin) in self.nodes.iter_mut().zip(&self.initial) {
            placed.x = origin.x;
            placed.y = origin.y;
        }
        for label in &mut self.labels {
            label.reset();
        }
        self.viewport = Viewport::default();
        self.mode = DragMode::Idle;

        Refresh {
            connectors: self.connectors(),
            labels: self.placed_labels(),
        }
    }

    fn place(&mut self, node: usize, origin: Point) -> Refresh {
        let placed = &mut self.nodes[node];
        placed.x = origin.x;
        placed.y = origin.y;

        let mut refresh = Refresh::default();
        for edge in self
            .edges
            .iter()
            .filter(|edge| edge.source == node || edge.target == node)
        {
            refresh.connectors.push(self.connector_for(edge));
            if let Some(label) = self.placed_label_for(edge) {
                refresh.labels.push(label);
            }
        }
        refresh
    }

    fn drag_label(&mut self, label: usize, cursor: Point) -> Refresh {
        let Some(edge) = self.edges.iter().find(|edge| edge.label == Some(label)).copied() else {
            return Refresh::default();
        };

        let connector = self.connector_for(&edge);
        self.labels[label].drag_to(connector.start, connector.end, cursor);

        Refresh {
            connectors: Vec::new(),
            labels: vec![self.labels[label].placed(connector.start, connector.end)],
        }
    }

    fn connector_for(&self, edge: &EdgeSlot) -> Connector {
        Connector::between(&self.nodes[edge.source], &self.nodes[edge.target], &self.shapes)
    }

    fn placed_label_for(&self, edge: &EdgeSlot) -> Option<PlacedLabel> {
        let label = &self.labels[edge.label?];
        let connector = self.connector_for(edge);
        Some(label.placed(connector.start, connector.end))
    }

    fn label_at(&self, cursor: Point) -> Option<usize> {
        self.edges.iter().rev().find_map(|edge| {
            let label = edge.label?;
            let connector = self.connector_for(edge);
            let anchor = self.labels[label].anchor(connector.start, connector.end);
            Rect::centered(anchor, LABEL_HIT_WIDTH, LABEL_HIT_HEIGHT)
                .contains(cursor)
                .then_some(label)
        })
    }

    fn node_at(&self, cursor: Point) -> Option<usize> {
        self.nodes
            .iter()
            .rposition(|placed| placed.rect().contains(cursor))
    }
}
