//! Integration tests: loading a `getCanvas` payload and querying it.

use ideaflow_core::containment::{plan_resize_cascade, resolve_parent};
use ideaflow_core::*;
use pretty_assertions::assert_eq;

const CANVAS: &str = r#"{
  "id": "canvas-1",
  "name": "Roadmap",
  "nodes": [
    { "id": "region-q1", "type": "region", "x": 0, "y": 0, "width": 100, "height": 100 },
    { "id": "idea-a", "type": "master_idea", "x": 10, "y": 10, "width": 30, "height": 20,
      "parentId": "region-q1", "content": "Launch" },
    { "id": "note-b", "type": "annotation", "x": 400, "y": 40, "width": 160, "height": 100 }
  ],
  "connections": [
    { "id": "c-ab", "fromNodeId": "idea-a", "toNodeId": "note-b", "label": "blocks" }
  ]
}"#;

fn load() -> CanvasDocument {
    let canvas: Canvas = serde_json::from_str(CANVAS).unwrap();
    CanvasDocument::from_canvas(canvas)
}

#[test]
fn wire_payload_loads_nodes_and_edges() {
    let doc = load();
    assert_eq!(doc.name.as_deref(), Some("Roadmap"));
    assert_eq!(doc.node_count(), 3);
    assert_eq!(doc.connection_count(), 1);
    assert_eq!(
        doc.children_of(NodeId::intern("region-q1")).to_vec(),
        vec![NodeId::intern("idea-a")]
    );
    let conn = doc.connection(ConnectionId::intern("c-ab")).unwrap();
    assert_eq!(conn.label.as_deref(), Some("blocks"));
}

#[test]
fn to_canvas_round_trips_wire_shape() {
    let doc = load();
    let out = serde_json::to_value(doc.to_canvas()).unwrap();
    let input: serde_json::Value = serde_json::from_str(CANVAS).unwrap();
    assert_eq!(out["nodes"][1]["parentId"], input["nodes"][1]["parentId"]);
    assert_eq!(out["connections"][0]["fromNodeId"], "idea-a");
    assert!(out["nodes"][2].get("parentId").is_none());
}

#[test]
fn widening_region_reprojects_its_child() {
    let mut doc = load();
    let region = NodeId::intern("region-q1");
    let old = doc.node(region).unwrap().bounds();
    doc.node_mut(region).unwrap().set_bounds(Bounds::new(0.0, 0.0, 200.0, 100.0));

    let plan = plan_resize_cascade(&doc, region, old);
    assert_eq!(
        plan,
        vec![(NodeId::intern("idea-a"), Bounds::new(20.0, 10.0, 60.0, 20.0))]
    );
}

#[test]
fn containment_and_hit_agree_on_membership() {
    let doc = load();
    let idea = NodeId::intern("idea-a");
    assert_eq!(resolve_parent(&doc, idea), Some(NodeId::intern("region-q1")));
    assert_eq!(resolve_parent(&doc, NodeId::intern("note-b")), None);
    assert_eq!(hit_test(&doc, Point::new(25.0, 20.0), 4.0), HitTarget::Node(idea));
}

#[test]
fn connection_endpoints_face_each_other() {
    let doc = load();
    let from = doc.node(NodeId::intern("idea-a")).unwrap().bounds();
    let to = doc.node(NodeId::intern("note-b")).unwrap().bounds();
    let (a, b) = closest_anchors(&from, &to);
    assert_eq!(a, Point::new(40.0, 20.0));
    assert_eq!(b, Point::new(400.0, 90.0));
}
