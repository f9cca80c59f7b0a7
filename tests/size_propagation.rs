use tagbox::error::Error;
use tagbox::{BoxNode, BoxTree, FourCC, default_registry};

fn build_tree() -> (BoxTree, tagbox::NodeId, tagbox::NodeId) {
    // root > moov > trak, assembled in memory
    let mut tree = BoxTree::new();
    let moov = tree
        .add_child(tree.root(), BoxNode::container(FourCC(*b"moov")))
        .expect("add moov");
    let trak = tree
        .add_child(moov, BoxNode::container(FourCC(*b"trak")))
        .expect("add trak");
    (tree, moov, trak)
}

#[test]
fn synthesized_boxes_start_unsized_and_unattached() {
    let node = BoxNode::leaf(FourCC(*b"free"), vec![0; 4]);
    assert_eq!(node.offset(), None);
    assert_eq!(node.size(), None);
}

#[test]
fn adding_a_child_grows_every_ancestor() {
    let (mut tree, moov, trak) = build_tree();
    // empty containers: 8-byte headers all the way up
    assert_eq!(tree.node(moov).size(), Some(16));
    assert_eq!(tree.node(trak).size(), Some(8));
    assert_eq!(tree.node(tree.root()).size(), Some(16));

    let tkhd = tree
        .add_child(trak, BoxNode::leaf(FourCC(*b"tkhd"), vec![0; 12]))
        .expect("add tkhd");

    assert_eq!(tree.node(tkhd).size(), Some(20));
    assert_eq!(tree.node(trak).size(), Some(28));
    assert_eq!(tree.node(moov).size(), Some(36));
    assert_eq!(tree.node(tree.root()).size(), Some(36));
}

#[test]
fn removing_a_child_shrinks_every_ancestor() {
    let (mut tree, moov, trak) = build_tree();
    let tkhd = tree
        .add_child(trak, BoxNode::leaf(FourCC(*b"tkhd"), vec![0; 12]))
        .expect("add tkhd");

    tree.remove_child(trak, tkhd).expect("remove tkhd");

    assert_eq!(tree.node(trak).size(), Some(8));
    assert_eq!(tree.node(moov).size(), Some(16));
    assert_eq!(tree.node(tree.root()).size(), Some(16));
    assert!(!tree.has_child(trak, "tkhd").expect("trak query"));
}

#[test]
fn payload_change_propagates_the_delta() {
    let (mut tree, moov, trak) = build_tree();
    let tkhd = tree
        .add_child(trak, BoxNode::leaf(FourCC(*b"tkhd"), vec![0; 12]))
        .expect("add tkhd");

    tree.set_payload(tkhd, vec![0; 32]).expect("set payload");

    assert_eq!(tree.node(tkhd).size(), Some(40));
    assert_eq!(tree.node(trak).size(), Some(48));
    assert_eq!(tree.node(moov).size(), Some(56));
    assert_eq!(tree.node(tree.root()).size(), Some(56));
}

#[test]
fn set_size_adjusts_ancestors_only() {
    let (mut tree, moov, trak) = build_tree();
    tree.set_size(trak, 108);

    assert_eq!(tree.node(trak).size(), Some(108));
    assert_eq!(tree.node(moov).size(), Some(116));
    assert_eq!(tree.node(tree.root()).size(), Some(116));
}

#[test]
fn child_queries_on_a_leaf_are_rejected() {
    let (mut tree, _moov, trak) = build_tree();
    let tkhd = tree
        .add_child(trak, BoxNode::leaf(FourCC(*b"tkhd"), vec![0; 12]))
        .expect("add tkhd");

    assert!(matches!(
        tree.children(tkhd, "free"),
        Err(Error::NotAContainer(_))
    ));
    assert!(matches!(
        tree.has_child(tkhd, "free"),
        Err(Error::NotAContainer(_))
    ));
    assert!(matches!(
        tree.children_matching(tkhd, "*"),
        Err(Error::NotAContainer(_))
    ));
    assert!(matches!(
        tree.add_child(tkhd, BoxNode::container(FourCC(*b"udta"))),
        Err(Error::NotAContainer(_))
    ));
}

#[test]
fn synthesized_tree_serializes_with_computed_sizes() {
    let (mut tree, _moov, trak) = build_tree();
    tree.add_child(trak, BoxNode::leaf(FourCC(*b"tkhd"), vec![9; 4]))
        .expect("add tkhd");

    let bytes = tree.to_bytes();
    let reg = default_registry();
    let reparsed = BoxTree::parse(&bytes, &reg).expect("reparse failed");

    assert!(tree.same_structure(&reparsed));
    let moov2 = reparsed.children(reparsed.root(), "moov").expect("query")[0];
    assert_eq!(reparsed.node(moov2).size(), Some(28));
}
