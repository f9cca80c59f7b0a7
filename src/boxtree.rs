use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::fourcc::{BoxKey, FourCC};
use crate::registry::BoxRegistry;
use log::debug;

/// Type code of the synthetic root container. The root stands for the whole
/// byte extent and is never serialized as a header.
pub const ROOT_TYPE: FourCC = FourCC(*b"root");

/// Index of a node inside its owning [`BoxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One parsed or synthesized box.
///
/// Parent links are arena indices, not references: children never extend
/// their parent's lifetime and the tree stays a single allocation of nodes.
#[derive(Debug, Clone)]
pub struct BoxNode {
    key: BoxKey,
    /// Byte offset of the header start, `None` for synthesized nodes.
    offset: Option<u64>,
    /// Total size including header, `None` until attached or serialized.
    size: Option<u64>,
    header_len: u64,
    container: bool,
    /// Opaque payload bytes. Empty for containers, whose payload is their
    /// children.
    payload: Vec<u8>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl BoxNode {
    /// Synthesize an opaque leaf box. Size stays unset until the node is
    /// attached to a tree.
    pub fn leaf(typ: FourCC, payload: Vec<u8>) -> Self {
        Self::detached(BoxKey::FourCC(typ), false, payload)
    }

    /// Synthesize a leaf box with a 16-byte user type (`uuid` encoding).
    pub fn leaf_uuid(guid: [u8; 16], payload: Vec<u8>) -> Self {
        Self::detached(BoxKey::Uuid(guid), false, payload)
    }

    /// Synthesize an empty container box.
    pub fn container(typ: FourCC) -> Self {
        Self::detached(BoxKey::FourCC(typ), true, Vec::new())
    }

    fn detached(key: BoxKey, container: bool, payload: Vec<u8>) -> Self {
        Self {
            key,
            offset: None,
            size: None,
            header_len: header_len_for(&key, payload.len() as u64),
            container,
            payload,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> &BoxKey {
        &self.key
    }

    /// File offset of the header start, `None` for synthesized nodes.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Declared total size including the header, `None` for a synthesized
    /// node that has not been attached yet.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    pub fn is_container(&self) -> bool {
        self.container
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Options for [`BoxTree::parse_with`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Dotted base path (e.g. `moov.trak.mdia`). When set, only boxes whose
    /// path is prefix-compatible with the base are materialized; everything
    /// else is skipped without constructing nodes.
    pub base: Option<String>,
}

/// A parsed box tree: an arena of [`BoxNode`]s under a synthetic root.
#[derive(Debug)]
pub struct BoxTree {
    nodes: Vec<BoxNode>,
    root: NodeId,
}

impl BoxTree {
    /// An empty tree holding only the synthetic root container.
    pub fn new() -> Self {
        let root = BoxNode {
            key: BoxKey::FourCC(ROOT_TYPE),
            offset: None,
            size: Some(0),
            header_len: 0,
            container: true,
            payload: Vec::new(),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Parse a complete byte extent into a tree.
    pub fn parse(buf: &[u8], registry: &BoxRegistry) -> Result<Self> {
        Self::parse_with(buf, registry, &ParseOptions::default())
    }

    /// Parse with options (path-scoped materialization).
    pub fn parse_with(buf: &[u8], registry: &BoxRegistry, opts: &ParseOptions) -> Result<Self> {
        let mut tree = Self::new();
        tree.nodes[0].offset = Some(0);
        tree.nodes[0].size = Some(buf.len() as u64);

        let mut cur = ByteCursor::new(buf);
        let mut path: Vec<String> = Vec::new();
        let root = tree.root;
        tree.construct_children(&mut cur, root, buf.len() as u64, &mut path, registry, opts)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &BoxNode {
        &self.nodes[id.0]
    }

    /// All children of a container in file order.
    pub fn child_ids(&self, id: NodeId) -> Result<&[NodeId]> {
        let n = self.require_container(id)?;
        Ok(&n.children)
    }

    /// Children whose 4CC type equals `typ`, in file order. A type may
    /// repeat; every occurrence is returned.
    pub fn children(&self, id: NodeId, typ: &str) -> Result<Vec<NodeId>> {
        let wanted = FourCC::from_str(typ).map(BoxKey::FourCC);
        let n = self.require_container(id)?;
        Ok(n.children
            .iter()
            .copied()
            .filter(|&c| Some(self.nodes[c.0].key) == wanted)
            .collect())
    }

    /// Children matching an exact [`BoxKey`] (the way to address GUID types).
    pub fn children_by_key(&self, id: NodeId, key: &BoxKey) -> Result<Vec<NodeId>> {
        let n = self.require_container(id)?;
        Ok(n.children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c.0].key == *key)
            .collect())
    }

    pub fn has_child(&self, id: NodeId, typ: &str) -> Result<bool> {
        Ok(!self.children(id, typ)?.is_empty())
    }

    /// Children whose type matches a case-insensitive glob (`*`, `?`).
    pub fn children_matching(&self, id: NodeId, glob: &str) -> Result<Vec<NodeId>> {
        let n = self.require_container(id)?;
        Ok(n.children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c.0].key.matches_glob(glob))
            .collect())
    }

    /// Attach a synthesized node as the last child of `parent` and grow
    /// every ancestor's size by the attached node's size.
    pub fn add_child(&mut self, parent: NodeId, mut node: BoxNode) -> Result<NodeId> {
        self.require_container(parent)?;

        let size = match node.size {
            Some(s) => s,
            None => {
                let payload_len = node.payload.len() as u64;
                node.header_len = header_len_for(&node.key, payload_len);
                node.header_len + payload_len
            }
        };
        node.size = Some(size);
        node.parent = Some(parent);

        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        self.propagate_delta(Some(parent), size as i64);
        Ok(id)
    }

    /// Detach a child and shrink every ancestor's size by its size. The
    /// node stays allocated in the arena but is no longer reachable.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require_container(parent)?;
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                Error::MalformedContainer(format!(
                    "box {} has no child {:?}",
                    self.nodes[parent.0].key, child
                ))
            })?;
        self.nodes[parent.0].children.remove(pos);
        let size = self.nodes[child.0].size.unwrap_or(0);
        self.nodes[child.0].parent = None;
        self.propagate_delta(Some(parent), -(size as i64));
        Ok(())
    }

    /// Overwrite a node's declared size and propagate the delta through
    /// every ancestor transitively.
    pub fn set_size(&mut self, id: NodeId, new_size: u64) {
        let old = self.nodes[id.0].size.unwrap_or(0);
        self.nodes[id.0].size = Some(new_size);
        let parent = self.nodes[id.0].parent;
        self.propagate_delta(parent, new_size as i64 - old as i64);
    }

    /// Replace a leaf's payload, recompute its size, and propagate the
    /// delta to every ancestor.
    pub fn set_payload(&mut self, id: NodeId, payload: Vec<u8>) -> Result<()> {
        if self.nodes[id.0].container {
            return Err(Error::MalformedContainer(format!(
                "box {} is a container; its payload is its children",
                self.nodes[id.0].key
            )));
        }
        let header_len = header_len_for(&self.nodes[id.0].key, payload.len() as u64);
        let new_size = header_len + payload.len() as u64;
        self.nodes[id.0].payload = payload;
        self.nodes[id.0].header_len = header_len;
        self.set_size(id, new_size);
        Ok(())
    }

    fn propagate_delta(&mut self, from: Option<NodeId>, delta: i64) {
        let mut cur = from;
        while let Some(id) = cur {
            let n = &mut self.nodes[id.0];
            let old = n.size.unwrap_or(0);
            n.size = Some(old.checked_add_signed(delta).unwrap_or(0));
            cur = n.parent;
        }
    }

    fn require_container(&self, id: NodeId) -> Result<&BoxNode> {
        let n = &self.nodes[id.0];
        if !n.container {
            return Err(Error::NotAContainer(n.key));
        }
        Ok(n)
    }

    // ---------- Parsing ----------

    fn construct_children(
        &mut self,
        cur: &mut ByteCursor,
        parent: NodeId,
        parent_end: u64,
        path: &mut Vec<String>,
        registry: &BoxRegistry,
        opts: &ParseOptions,
    ) -> Result<()> {
        while (cur.offset() as u64) < parent_end {
            let start = cur.offset() as u64;
            if parent_end - start < 8 {
                return Err(Error::MalformedContainer(format!(
                    "{} trailing bytes at offset {start} cannot hold a box header",
                    parent_end - start
                )));
            }

            let size32 = cur.read_u32()?;
            let typ = cur.read_fourcc()?;

            let size = match size32 {
                // extended size follows the type
                1 => cur.read_u64()?,
                // box extends to the end of the enclosing extent
                0 => parent_end - start,
                s => s as u64,
            };

            let key = if typ == FourCC(*b"uuid") {
                BoxKey::Uuid(cur.read_guid()?)
            } else {
                BoxKey::FourCC(typ)
            };

            let header_len = cur.offset() as u64 - start;
            if size < header_len {
                return Err(Error::MalformedContainer(format!(
                    "box {key} at offset {start} declares size {size}, smaller than its {header_len}-byte header"
                )));
            }
            let end = start + size;
            if end > parent_end {
                return Err(Error::MalformedContainer(format!(
                    "box {key} at offset {start} ends at {end}, past its parent's end {parent_end}"
                )));
            }

            path.push(key.to_string());
            if let Some(base) = &opts.base {
                if !path_compatible(base, path) {
                    debug!("skipping {} (outside base {base})", path.join("."));
                    path.pop();
                    cur.set_offset(end as usize)?;
                    continue;
                }
            }

            let container = registry.is_container(&key);
            debug!(
                "box {key} at offset {start}: size={size} header={header_len} container={container}"
            );

            let payload = if container {
                Vec::new()
            } else {
                cur.read_bytes((end - start - header_len) as usize)?.to_vec()
            };

            let id = NodeId(self.nodes.len());
            self.nodes.push(BoxNode {
                key,
                offset: Some(start),
                size: Some(size),
                header_len,
                container,
                payload,
                parent: Some(parent),
                children: Vec::new(),
            });
            self.nodes[parent.0].children.push(id);

            if container {
                self.construct_children(cur, id, end, path, registry, opts)?;
            }

            path.pop();
            // Advance by the declared size, not by bytes consumed: trailing
            // padding inside a box is skipped, never re-parsed.
            cur.set_offset(end as usize)?;
        }
        Ok(())
    }

    // ---------- Serialization ----------

    /// Serialize the whole tree. Sizes are recomputed from actual content;
    /// declared sizes from the original parse are never trusted.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for &c in &self.nodes[self.root.0].children {
            self.write_node(c, &mut out);
        }
        out
    }

    /// Serialize a single subtree.
    pub fn node_to_bytes(&self, id: NodeId) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_node(id, &mut out);
        out
    }

    fn serialized_payload_len(&self, id: NodeId) -> u64 {
        let n = &self.nodes[id.0];
        if n.container {
            n.children.iter().map(|&c| self.serialized_len(c)).sum()
        } else {
            n.payload.len() as u64
        }
    }

    fn serialized_len(&self, id: NodeId) -> u64 {
        let payload_len = self.serialized_payload_len(id);
        header_len_for(&self.nodes[id.0].key, payload_len) + payload_len
    }

    fn write_node(&self, id: NodeId, out: &mut Vec<u8>) {
        let n = &self.nodes[id.0];
        let payload_len = self.serialized_payload_len(id);
        let uuid_extra: u64 = match n.key {
            BoxKey::Uuid(_) => 16,
            BoxKey::FourCC(_) => 0,
        };

        let short_total = 8 + uuid_extra + payload_len;
        let extended = short_total > u32::MAX as u64;

        if extended {
            out.extend_from_slice(&1u32.to_be_bytes());
        } else {
            out.extend_from_slice(&(short_total as u32).to_be_bytes());
        }
        match n.key {
            BoxKey::FourCC(cc) => out.extend_from_slice(&cc.0),
            BoxKey::Uuid(_) => out.extend_from_slice(b"uuid"),
        }
        if extended {
            out.extend_from_slice(&(short_total + 8).to_be_bytes());
        }
        if let BoxKey::Uuid(guid) = n.key {
            out.extend_from_slice(&guid);
        }

        if n.container {
            for &c in &n.children {
                self.write_node(c, out);
            }
        } else {
            out.extend_from_slice(&n.payload);
        }
    }

    /// Structural equality: same type codes, same child order, same payload
    /// bytes. Offsets and declared sizes are not compared.
    pub fn same_structure(&self, other: &BoxTree) -> bool {
        self.nodes_equal(self.root, other, other.root)
    }

    fn nodes_equal(&self, a: NodeId, other: &BoxTree, b: NodeId) -> bool {
        let na = &self.nodes[a.0];
        let nb = &other.nodes[b.0];
        if na.key != nb.key || na.container != nb.container || na.payload != nb.payload {
            return false;
        }
        if na.children.len() != nb.children.len() {
            return false;
        }
        na.children
            .iter()
            .zip(&nb.children)
            .all(|(&ca, &cb)| self.nodes_equal(ca, other, cb))
    }
}

impl Default for BoxTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Header length a key needs for a given payload length: 8 bytes, plus 8
/// for the extended size form, plus 16 for a GUID user type.
fn header_len_for(key: &BoxKey, payload_len: u64) -> u64 {
    let uuid_extra: u64 = match key {
        BoxKey::Uuid(_) => 16,
        BoxKey::FourCC(_) => 0,
    };
    let short = 8 + uuid_extra;
    if short + payload_len > u32::MAX as u64 {
        short + 8
    } else {
        short
    }
}

/// A path is compatible with the base when the two agree on every component
/// they both have: either the path leads toward the base subtree or it is
/// inside it.
fn path_compatible(base: &str, path: &[String]) -> bool {
    base.split('.')
        .zip(path.iter())
        .all(|(b, p)| b.eq_ignore_ascii_case(p))
}
