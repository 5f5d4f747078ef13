use crate::diagram::{DiagramData, Edge, Node};
use crate::measure::TextMetrics;
use std::collections::HashMap;
use std::fmt::{self, Write};

pub struct SvgRenderer {
    metrics: TextMetrics,
    node_width: f64,
    node_height: f64,
    padding: f64,
    min_width: f64,
    min_height: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            node_width: 120.0,
            node_height: 80.0,
            padding: 50.0,
            min_width: 800.0,
            min_height: 600.0,
        }
    }
}

impl SvgRenderer {
    pub fn render(&self, diagram: &DiagramData) -> Result<String, fmt::Error> {
        let mut svg = String::new();
        let (width, height) = self.canvas_size(diagram);

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )?;

        writeln!(
            &mut svg,
            r##"<defs>
  <marker id="arrowhead" viewBox="0 -5 10 10" refX="8" refY="0" markerWidth="6" markerHeight="6" orient="auto">
    <path d="M0,-5L10,0L0,5" fill="#888" />
  </marker>
</defs>
<style>
  .node {{ stroke: #555; stroke-width: 2; }}
  .node-text {{ font-family: sans-serif; font-size: {}px; fill: #fff; }}
  .edge {{ stroke: #888; stroke-width: 2; fill: none; }}
  .edge-label {{ font-family: sans-serif; font-size: 11px; fill: #666; }}
  .placeholder {{ font-family: sans-serif; font-size: 16px; fill: #888; }}
</style>"##,
            self.metrics.font_size
        )?;

        if diagram.nodes.is_empty() {
            writeln!(
                &mut svg,
                r#"<text class="placeholder" x="{}" y="{}" text-anchor="middle">No diagram data available</text>"#,
                width / 2.0,
                height / 2.0
            )?;
            writeln!(&mut svg, "</svg>")?;
            return Ok(svg);
        }

        let node_map: HashMap<&str, &Node> =
            diagram.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        // Edges first so boxes are drawn over them
        for edge in &diagram.edges {
            if let (Some(from), Some(to)) = (
                node_map.get(edge.from.as_str()),
                node_map.get(edge.to.as_str()),
            ) {
                self.render_edge(&mut svg, edge, from, to)?;
            }
        }

        for node in &diagram.nodes {
            self.render_node(&mut svg, node)?;
        }

        writeln!(&mut svg, "</svg>")?;
        Ok(svg)
    }

    fn canvas_size(&self, diagram: &DiagramData) -> (f64, f64) {
        let right = diagram
            .nodes
            .iter()
            .map(|n| n.x as f64 + self.node_width + self.padding)
            .fold(self.min_width, f64::max);
        let bottom = diagram
            .nodes
            .iter()
            .map(|n| n.y as f64 + self.node_height + self.padding)
            .fold(self.min_height, f64::max);
        (right, bottom)
    }

    fn render_node(&self, svg: &mut String, node: &Node) -> fmt::Result {
        let x = node.x as f64;
        let y = node.y as f64;

        writeln!(
            svg,
            r#"<g class="node-group" transform="translate({}, {})">"#,
            x, y
        )?;
        writeln!(
            svg,
            r#"<rect class="node" width="{}" height="{}" rx="8" ry="8" fill="{}" />"#,
            self.node_width,
            self.node_height,
            escape_xml(&node.color)
        )?;

        let lines = self.metrics.wrap(&node.label, self.node_width - 10.0);
        let line_px = self.metrics.font_size * self.metrics.line_height;
        // center the block of lines vertically
        let first_y = self.node_height / 2.0 - line_px * (lines.len().saturating_sub(1)) as f64 / 2.0;

        write!(
            svg,
            r#"<text class="node-text" x="{}" y="{}" text-anchor="middle">"#,
            self.node_width / 2.0,
            first_y
        )?;
        for (i, line) in lines.iter().enumerate() {
            let dy = if i == 0 { 0.0 } else { self.metrics.line_height };
            write!(
                svg,
                r#"<tspan x="{}" dy="{}em">{}</tspan>"#,
                self.node_width / 2.0,
                dy,
                escape_xml(line)
            )?;
        }
        writeln!(svg, "</text>")?;
        writeln!(svg, "</g>")
    }

    fn render_edge(&self, svg: &mut String, edge: &Edge, from: &Node, to: &Node) -> fmt::Result {
        let x1 = from.x as f64 + self.node_width;
        let y1 = from.y as f64 + self.node_height / 2.0;
        let x2 = to.x as f64;
        let y2 = to.y as f64 + self.node_height / 2.0;

        writeln!(
            svg,
            r#"<path class="edge" d="M {} {} L {} {}" marker-end="url(#arrowhead)" />"#,
            x1, y1, x2, y2
        )?;
        writeln!(
            svg,
            r#"<text class="edge-label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0 - 5.0,
            escape_xml(&edge.label)
        )
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
