use tagbox::summary::summarize;
use tagbox::{BoxTree, default_registry};

fn sample_file() -> Vec<u8> {
    let mut v = Vec::new();

    // ftyp with one compatible brand
    v.extend_from_slice(&24u32.to_be_bytes());
    v.extend_from_slice(b"ftyp");
    v.extend_from_slice(b"isom");
    v.extend_from_slice(&512u32.to_be_bytes());
    v.extend_from_slice(b"iso2");

    // moov > mvhd (v0, timescale 1000, duration 0)
    let mut mvhd = Vec::new();
    mvhd.push(0);
    mvhd.extend_from_slice(&[0, 0, 0]);
    mvhd.extend_from_slice(&0u32.to_be_bytes());
    mvhd.extend_from_slice(&0u32.to_be_bytes());
    mvhd.extend_from_slice(&1000u32.to_be_bytes());
    mvhd.extend_from_slice(&0u32.to_be_bytes());

    v.extend_from_slice(&((8 + 8 + mvhd.len()) as u32).to_be_bytes());
    v.extend_from_slice(b"moov");
    v.extend_from_slice(&((8 + mvhd.len()) as u32).to_be_bytes());
    v.extend_from_slice(b"mvhd");
    v.extend_from_slice(&mvhd);

    v
}

#[test]
fn summary_serializes_to_json() {
    let data = sample_file();
    let reg = default_registry();
    let tree = BoxTree::parse(&data, &reg).expect("parse failed");

    let summaries = summarize(&tree, &reg, false);
    let json = serde_json::to_value(&summaries).expect("to_value");

    let arr = json.as_array().expect("array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["typ"], "ftyp");
    assert_eq!(arr[0]["size"], 24);
    assert_eq!(arr[0]["offset"], 0);
    assert_eq!(arr[0]["name"], "File Type Box");
    assert_eq!(arr[0]["container"], false);

    assert_eq!(arr[1]["typ"], "moov");
    assert_eq!(arr[1]["container"], true);
    let kids = arr[1]["children"].as_array().expect("children");
    assert_eq!(kids.len(), 1);
    assert_eq!(kids[0]["typ"], "mvhd");
    assert_eq!(kids[0]["name"], "Movie Header Box");
}

#[test]
fn decoded_values_appear_when_requested() {
    let data = sample_file();
    let reg = default_registry();
    let tree = BoxTree::parse(&data, &reg).expect("parse failed");

    let summaries = summarize(&tree, &reg, true);
    let json = serde_json::to_value(&summaries).expect("to_value");

    let decoded = json[0]["decoded"].as_str().expect("ftyp decoded");
    assert!(decoded.contains("isom"));

    let mvhd = &json[1]["children"][0];
    let decoded = mvhd["decoded"].as_str().expect("mvhd decoded");
    assert!(decoded.contains("1000"));
}

#[test]
fn broken_payload_degrades_to_an_error_note() {
    let mut data = Vec::new();
    // mvhd payload far too short for its decoder
    data.extend_from_slice(&10u32.to_be_bytes());
    data.extend_from_slice(b"mvhd");
    data.extend_from_slice(&[0, 0]);

    let reg = default_registry();
    let tree = BoxTree::parse(&data, &reg).expect("parse failed");

    let summaries = summarize(&tree, &reg, true);
    let json = serde_json::to_value(&summaries).expect("to_value");
    let decoded = json[0]["decoded"].as_str().expect("decoded note");
    assert!(decoded.starts_with("[decode error:"));
}
