pub mod diagram;
pub mod handler;
pub mod measure;
pub mod parser;
pub mod sql;
pub mod svg;

use wasm_bindgen::prelude::*;

use handler::{RequestConfig, diagram_for, handle_request};
use svg::SvgRenderer;

pub use diagram::{DiagramData, Edge, Node, NodeKind};
pub use parser::parse_query;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Diagram data for a SQL query as a JS object
#[wasm_bindgen(js_name = "sqlToDiagram")]
pub fn sql_to_diagram(sql_query: &str) -> Result<JsValue, String> {
    let diagram = diagram_for(sql_query, &RequestConfig::default()).map_err(|e| e.to_string())?;
    let json = serde_json::to_string(&diagram).map_err(|e| e.to_string())?;
    js_sys::JSON::parse(&json).map_err(|_| "Failed to convert diagram to a JS object".to_string())
}

/// Render a SQL query's diagram to SVG
#[wasm_bindgen(js_name = "sqlToSvg")]
pub fn sql_to_svg(sql_query: &str) -> Result<String, String> {
    let diagram = diagram_for(sql_query, &RequestConfig::default()).map_err(|e| e.to_string())?;
    SvgRenderer::default()
        .render(&diagram)
        .map_err(|e| e.to_string())
}

/// Answer a `{"sql_query": ...}` request body with the response JSON
#[wasm_bindgen(js_name = "generateDiagram")]
pub fn generate_diagram(body: &str) -> Result<String, String> {
    handle_request(body, &RequestConfig::default())
        .to_json()
        .map_err(|e| e.to_string())
}
