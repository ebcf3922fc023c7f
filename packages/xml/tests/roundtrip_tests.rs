//! Parse → write fidelity tests.

use vellum_xml::{parse, write_document};

fn roundtrip(source: &str) -> String {
    let doc = parse(source).unwrap();
    write_document(&doc.roots, &doc.nodes)
}

#[test]
fn test_simple_document_is_byte_identical() {
    let source = "<a><b/></a>";
    assert_eq!(roundtrip(source), source);
}

#[test]
fn test_formatting_survives() {
    let source = "<svg>\n  <rect width=\"10\"/>\n  <text>hello</text>\n</svg>";
    assert_eq!(roundtrip(source), source);
}

#[test]
fn test_attribute_order_is_normalized() {
    assert_eq!(
        roundtrip(r#"<a z="3" b="2" a="1"/>"#),
        r#"<a a="1" b="2" z="3"/>"#
    );
}

#[test]
fn test_entities_reencode() {
    let source = "<a note=\"x &amp; y\">1 &lt; 2 &amp; 3</a>";
    assert_eq!(roundtrip(source), source);
}

#[test]
fn test_comment_and_cdata_verbatim() {
    let source = "<a><!-- keep  spacing --><![CDATA[raw < & >]]></a>";
    assert_eq!(roundtrip(source), source);
}

#[test]
fn test_qualified_names_reemit_with_prefix() {
    let source = r#"<svg:g xmlns:svg="http://www.w3.org/2000/svg"><svg:rect/></svg:g>"#;
    assert_eq!(roundtrip(source), source);
}

#[test]
fn test_mixed_content_document() {
    let source = "<p>before <em>emphasis</em> after</p>";
    assert_eq!(roundtrip(source), source);
}
