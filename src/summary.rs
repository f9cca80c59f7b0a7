use crate::boxtree::{BoxTree, NodeId};
use crate::fourcc::BoxKey;
use crate::registry::{BoxRegistry, PayloadValue};
use serde::Serialize;

/// A JSON-serializable snapshot of a single box.
///
/// Suitable for tooling, diffing, and test assertions; offsets are absent
/// for synthesized nodes.
#[derive(Serialize)]
pub struct BoxSummary {
    pub offset: Option<u64>,
    pub size: u64,
    pub header_size: u64,
    pub typ: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    pub container: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BoxSummary>>,
}

/// Snapshot every top-level box of a tree.
pub fn summarize(tree: &BoxTree, registry: &BoxRegistry, decode: bool) -> Vec<BoxSummary> {
    tree.child_ids(tree.root())
        .unwrap_or_default()
        .iter()
        .map(|&id| build(tree, id, registry, decode))
        .collect()
}

fn build(tree: &BoxTree, id: NodeId, registry: &BoxRegistry, decode: bool) -> BoxSummary {
    let n = tree.node(id);

    let (typ, uuid) = match n.key() {
        BoxKey::FourCC(cc) => (cc.as_str_lossy(), None),
        BoxKey::Uuid(g) => ("uuid".to_string(), Some(hex::encode(g))),
    };

    let decoded = if decode && !n.is_container() {
        match registry.decode(n.key(), n.payload()) {
            Some(Ok(PayloadValue::Text(s))) => Some(s),
            Some(Ok(PayloadValue::Structured(d))) => Some(format!("{d:?}")),
            // A broken payload degrades to a note, never aborts the summary.
            Some(Err(e)) => Some(format!("[decode error: {e}]")),
            None => None,
        }
    } else {
        None
    };

    let children = if n.is_container() {
        Some(
            tree.child_ids(id)
                .unwrap_or_default()
                .iter()
                .map(|&c| build(tree, c, registry, decode))
                .collect(),
        )
    } else {
        None
    };

    BoxSummary {
        offset: n.offset(),
        size: n.size().unwrap_or(0),
        header_size: n.header_len(),
        typ,
        uuid,
        name: registry.name(n.key()).to_string(),
        container: n.is_container(),
        decoded,
        children,
    }
}
