use std::cell::Cell;
use std::rc::Rc;
use vellum_editor::{element, Change, Command, Document, DocumentError, Path};

#[test]
fn test_stream_folds_undo_into_one_command() -> anyhow::Result<()> {
    let original = "<a><b/></a>";
    let mut doc = Document::from_source(original)?;
    let b = doc
        .resolve(&Path::new().element("a").element("b"))
        .unwrap()
        .id();

    doc.begin_stream("remove b")?;
    let outcome = doc.perform(Command::single("remove", Change::destroy(b)))?;
    // The inverse went into the stream, not the outcome.
    assert!(outcome.undo.is_none());
    assert_eq!(doc.source(), "<a/>");

    let undo = doc.complete_stream()?;
    doc.perform(undo)?;
    assert_eq!(doc.source(), original);
    Ok(())
}

#[test]
fn test_typing_burst_coalesces_to_single_restore() -> anyhow::Result<()> {
    let mut doc = Document::from_source("<label>draft</label>")?;
    let text = doc
        .resolve(&Path::new().element("label").text(0))
        .unwrap()
        .id();

    doc.begin_stream("typing")?;
    for content in ["draf", "dra", "dr", "d", ""] {
        doc.perform(Command::single("keystroke", Change::update_content(text, content)))?;
    }
    let undo = doc.complete_stream()?;

    // Five keystrokes collapse into one inverse reaching the pre-stream text.
    assert_eq!(undo.changes.len(), 1);
    doc.perform(undo)?;
    assert_eq!(doc.source(), "<label>draft</label>");
    Ok(())
}

#[test]
fn test_cancel_reverts_to_pre_stream_state() -> anyhow::Result<()> {
    let original = r#"<rect width="5"/>"#;
    let mut doc = Document::from_source(original)?;
    let rect = doc.roots()[0];

    doc.begin_stream("drag")?;
    for width in ["10", "20", "30"] {
        doc.perform(Command::single(
            "drag step",
            Change::upsert_attribute(rect, "width", width),
        ))?;
    }
    assert_eq!(doc.source(), r#"<rect width="30"/>"#);

    doc.cancel_stream()?;
    assert_eq!(doc.source(), original);
    assert!(!doc.stream_open());
    Ok(())
}

#[test]
fn test_complete_undo_equals_cancel() -> anyhow::Result<()> {
    let run = |cancel: bool| -> anyhow::Result<String> {
        let mut doc = Document::from_source("<g><a/></g>")?;
        let g = doc.roots()[0];

        doc.begin_stream("edit")?;
        doc.perform(Command::single(
            "add",
            Change::create_snapshot(Some(g), 1, element("b").into_snapshot()),
        ))?;
        doc.perform(Command::single(
            "tint",
            Change::upsert_attribute(g, "fill", "red"),
        ))?;

        if cancel {
            doc.cancel_stream()?;
        } else {
            let undo = doc.complete_stream()?;
            doc.perform(undo)?;
        }
        Ok(doc.source())
    };

    assert_eq!(run(false)?, run(true)?);
    assert_eq!(run(true)?, "<g><a/></g>");
    Ok(())
}

#[test]
fn test_reference_names_persist_within_stream() -> anyhow::Result<()> {
    let mut doc = Document::from_source("<svg><rect/></svg>")?;
    let svg = doc.roots()[0];
    let rect = doc
        .resolve(&Path::new().element("svg").element("rect"))
        .unwrap()
        .id();

    doc.begin_stream("gradient fill")?;
    doc.perform(Command::single(
        "add gradient",
        Change::create(Some(svg), 0, |_| {
            element("linearGradient")
                .reference("grad", "gradient")
                .into_snapshot()
        }),
    ))?;
    // A later command in the same stream still sees the resolved name.
    doc.perform(Command::single(
        "fill",
        Change::upsert_attribute(
            rect,
            "fill",
            vellum_editor::AttrValue::deferred(|names| {
                format!(
                    "url(#{})",
                    names.get("grad").map(String::as_str).unwrap_or_default()
                )
            }),
        ),
    ))?;
    doc.complete_stream()?;

    assert_eq!(
        doc.source(),
        r#"<svg><linearGradient id="gradient"/><rect fill="url(#gradient)"/></svg>"#
    );
    Ok(())
}

#[test]
fn test_failed_stream_command_keeps_only_earlier_names() -> anyhow::Result<()> {
    let mut doc = Document::from_source("<svg><rect/></svg>")?;
    let svg = doc.roots()[0];
    let rect = doc
        .resolve(&Path::new().element("svg").element("rect"))
        .unwrap()
        .id();

    doc.begin_stream("edit")?;
    doc.perform(Command::single(
        "add gradient",
        Change::create(Some(svg), 0, |_| {
            element("linearGradient")
                .reference("grad", "gradient")
                .into_snapshot()
        }),
    ))?;

    // This command resolves "stop" before failing; its name must not
    // survive, while "grad" from the earlier command still does.
    let err = doc
        .perform(Command::new(
            "bad",
            vec![
                Change::create(Some(svg), 0, |_| {
                    element("stop").reference("stop", "stop").into_snapshot()
                }),
                Change::update_content(svg, "nope"),
            ],
        ))
        .unwrap_err();
    assert!(matches!(err, DocumentError::CommandFailed { .. }));

    doc.perform(Command::single(
        "refer",
        Change::upsert_attribute(
            rect,
            "fill",
            vellum_editor::AttrValue::deferred(|names| {
                format!(
                    "{}/{}",
                    names.get("grad").map(String::as_str).unwrap_or_default(),
                    names.get("stop").map(String::as_str).unwrap_or_default()
                )
            }),
        ),
    ))?;
    doc.complete_stream()?;

    assert_eq!(
        doc.source(),
        r#"<svg><linearGradient id="gradient"/><rect fill="gradient/"/></svg>"#
    );
    Ok(())
}

#[test]
fn test_stream_errors_without_open_stream() {
    let mut doc = Document::new();
    assert!(matches!(
        doc.cancel_stream(),
        Err(DocumentError::NoOpenCommandStream)
    ));
    assert!(matches!(
        doc.complete_stream(),
        Err(DocumentError::NoOpenCommandStream)
    ));
}

#[test]
fn test_factory_sees_inferred_indentation() -> anyhow::Result<()> {
    let mut doc = Document::from_source("<a>\n  <b/>\n</a>")?;
    let a = doc.roots()[0];

    let seen = Rc::new(Cell::new(usize::MAX));
    let probe = seen.clone();
    doc.perform(Command::single(
        "add",
        Change::create(Some(a), 2, move |context| {
            probe.set(context.indent_level);
            element("c").into_indented_snapshot(context.indent_level)
        }),
    ))?;

    // The whitespace before <b/> puts the insertion point one level deep.
    assert_eq!(seen.get(), 1);
    assert_eq!(doc.source(), "<a>\n  <b/>\n  <c/>\n</a>");
    Ok(())
}
