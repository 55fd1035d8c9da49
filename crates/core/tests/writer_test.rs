//! Tests for incremental updates: page reordering, Info rewriting, writing a
//! document from scratch and re-reading the result.

mod common;

use std::fs::OpenOptions;
use std::io::Cursor;

use chrono::NaiveDate;
use common::{append_update, build_pdf, last_startxref, three_page_pdf};
use quire_core::config::ParseOptions;
use quire_core::error::PdfError;
use quire_core::model::{IndirectRef, PdfDict, PdfObject};
use quire_core::{IncrementalWriter, PdfDocument};

fn labels(doc: &mut PdfDocument) -> Vec<String> {
    let pages = doc.pages().to_vec();
    pages
        .into_iter()
        .map(|page| {
            doc.materialize(page)
                .unwrap()
                .as_dict()
                .unwrap()
                .get_text("Label")
                .unwrap()
                .unwrap()
        })
        .collect()
}

/// Apply `edit` to the three-page fixture and append a catalog, page tree
/// and trailer.
fn save_incremental(edit: impl FnOnce(&mut PdfDocument)) -> (Vec<u8>, Vec<u8>) {
    let original = three_page_pdf();
    let mut doc = PdfDocument::from_bytes(&original).unwrap();
    edit(&mut doc);
    let mut writer = IncrementalWriter::new(&mut doc, Cursor::new(original.clone())).unwrap();
    writer.write_catalog().unwrap();
    writer.write_xref_and_trailer(None).unwrap();
    let updated = writer.finish().unwrap().into_inner();
    (original, updated)
}

#[test]
fn test_reorder_pages() {
    let (original, updated) = save_incremental(|doc| doc.pages_mut().reverse());
    assert!(updated.starts_with(&original));

    let mut doc = PdfDocument::from_bytes(&updated).unwrap();
    assert_eq!(labels(&mut doc), vec!["c", "b", "a"]);
    assert_eq!(doc.trailers().len(), 2);
    assert_eq!(
        doc.trailer().unwrap().get_int("Prev"),
        Some(i64::try_from(last_startxref(&original)).unwrap())
    );
    assert_eq!(doc.page_tree_root().get_int("Count"), Some(3));

    let pages_ref = doc.pages_ref().unwrap();
    assert_ne!(pages_ref, IndirectRef::new(2, 0));
    for page in doc.pages().to_vec() {
        let page = doc.read_indirect(page).unwrap();
        assert_eq!(page.as_dict().unwrap().get_ref("Parent"), Some(pages_ref));
    }
}

#[test]
fn test_update_section_layout() {
    let (original, updated) = save_incremental(|doc| doc.pages_mut().reverse());
    let tail = String::from_utf8(updated[original.len()..].to_vec()).unwrap();

    // Catalog 8, Pages 9, rewritten pages 10..=12, Info 13; ids 1..=7 freed.
    assert!(tail.contains("\nxref\n0 14\n0000000001 65536 f \n"), "{tail}");
    assert!(tail.contains("8 0 obj\n<<\n/Type /Catalog\n/Pages 9 0 R\n>>\nendobj\n"));
    assert!(tail.contains("/Kids [ 12 0 R 11 0 R 10 0 R ]"));
    assert!(tail.contains("trailer\n<<\n/Root 8 0 R\n/Size 14\n"));
    assert!(tail.contains("/Info 13 0 R\n>>\nstartxref\n"));
    assert!(tail.ends_with("%%EOF\n"));
}

#[test]
fn test_drop_page() {
    let (_, updated) = save_incremental(|doc| {
        doc.pages_mut().remove(1);
    });
    let mut doc = PdfDocument::from_bytes(&updated).unwrap();
    assert_eq!(labels(&mut doc), vec!["a", "c"]);
    assert_eq!(doc.page_tree_root().get_int("Count"), Some(2));
}

#[test]
fn test_edit_page_before_writing() {
    let (_, updated) = save_incremental(|doc| {
        let first = doc.pages()[0];
        let page = doc.object_mut(first).unwrap();
        if let PdfObject::Dict(page) = page {
            page.set("Rotate", 90);
        }
    });
    let mut doc = PdfDocument::from_bytes(&updated).unwrap();
    let first = doc.read_indirect(doc.pages()[0]).unwrap();
    assert_eq!(first.as_dict().unwrap().get_int("Rotate"), Some(90));
}

#[test]
fn test_info_round_trip() {
    let modified = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(13, 5, 9)
        .unwrap();
    let (_, updated) = save_incremental(|doc| {
        let info = doc.info_mut();
        info.set_text("Title", "Zürich notes");
        info.set_date("ModDate", modified);
    });

    let doc = PdfDocument::from_bytes(&updated).unwrap();
    assert_ne!(doc.info_ref(), Some(IndirectRef::new(7, 0)));
    assert_eq!(
        doc.info().get_text("Title").unwrap().as_deref(),
        Some("Zürich notes")
    );
    assert_eq!(
        doc.info().get_text("Producer").unwrap().as_deref(),
        Some("quire tests")
    );
    assert_eq!(doc.info().get_date("ModDate").unwrap(), Some(modified));
}

#[test]
fn test_second_update_chains_to_first() {
    let (_, first) = save_incremental(|doc| doc.pages_mut().reverse());

    let mut doc = PdfDocument::from_bytes(&first).unwrap();
    doc.pages_mut().swap(0, 2);
    let mut writer = IncrementalWriter::new(&mut doc, Cursor::new(first.clone())).unwrap();
    writer.write_catalog().unwrap();
    writer.write_xref_and_trailer(None).unwrap();
    let second = writer.finish().unwrap().into_inner();

    let mut doc = PdfDocument::from_bytes(&second).unwrap();
    assert_eq!(doc.trailers().len(), 3);
    assert_eq!(
        doc.trailer().unwrap().get_int("Prev"),
        Some(i64::try_from(last_startxref(&first)).unwrap())
    );
    assert_eq!(labels(&mut doc), vec!["a", "b", "c"]);
}

#[test]
fn test_write_new_document() {
    let mut doc = PdfDocument::new();
    let mut writer = IncrementalWriter::new(&mut doc, Cursor::new(Vec::new())).unwrap();
    writer.write_header().unwrap();
    writer.write_comment("created by quire tests").unwrap();

    let page_ref = writer.document_mut().next_object_id(Some(0)).unwrap();
    writer.document_mut().pages_mut().push(page_ref);
    writer.write_catalog().unwrap();

    let mut page = PdfDict::new();
    page.set("MediaBox", vec![PdfObject::Int(0), 0.into(), 200.into(), 100.into()]);
    page.set_text("Label", "only");
    writer.write_page_at(0, page).unwrap();
    writer.document_mut().info_mut().set_text("Title", "Fresh");
    writer.write_xref_and_trailer(None).unwrap();
    let data = writer.finish().unwrap().into_inner();

    assert!(data.starts_with(b"%PDF-1.4\n% created by quire tests\n"));
    let mut doc = PdfDocument::from_bytes(&data).unwrap();
    assert_eq!(doc.trailers().len(), 1);
    assert!(doc.trailer().unwrap().get("Prev").is_none());
    assert_eq!(doc.pages(), &[page_ref]);
    assert_eq!(labels(&mut doc), vec!["only"]);
    assert_eq!(
        doc.info().get_text("Title").unwrap().as_deref(),
        Some("Fresh")
    );
}

#[test]
fn test_update_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("update.pdf");
    std::fs::write(&path, three_page_pdf()).unwrap();

    let mut doc = PdfDocument::open(&path, ParseOptions::default()).unwrap();
    doc.pages_mut().rotate_left(1);
    doc.close();
    let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    let mut writer = IncrementalWriter::new(&mut doc, file).unwrap();
    writer.write_catalog().unwrap();
    writer.write_xref_and_trailer(None).unwrap();
    writer.finish().unwrap();

    let mut doc = PdfDocument::open(&path, ParseOptions::default()).unwrap();
    assert_eq!(labels(&mut doc), vec!["b", "c", "a"]);
}

#[test]
fn test_no_id_left_after_max() {
    let mut data = three_page_pdf();
    let prev = last_startxref(&data);
    append_update(
        &mut data,
        &[(u32::MAX, b"null")],
        "/Size 8 /Root 1 0 R",
        prev,
    );
    let mut doc = PdfDocument::from_bytes(&data).unwrap();
    assert_eq!(doc.xref().max_id(), Some(u32::MAX));

    let mut writer = IncrementalWriter::new(&mut doc, Cursor::new(data.clone())).unwrap();
    assert!(matches!(writer.write_catalog(), Err(PdfError::Format(_))));
    assert!(matches!(
        writer.write_obj(None, &PdfObject::Null),
        Err(PdfError::Format(_))
    ));
}

#[test]
fn test_buffer_readable_while_writing() {
    let data = build_pdf(
        &[
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [] /Count 0 >>",
            b"<< /Note (unreferenced) >>",
        ],
        "",
    );
    let unreferenced = IndirectRef::new(3, 0);
    let mut doc = PdfDocument::from_bytes(&data).unwrap();
    let mut writer = IncrementalWriter::new(&mut doc, Cursor::new(data.clone())).unwrap();
    let note = writer.document_mut().read_indirect(unreferenced).unwrap();
    assert_eq!(
        note.as_dict().unwrap().get_text("Note").unwrap().as_deref(),
        Some("unreferenced")
    );
    writer.finish().unwrap();

    let mut doc = PdfDocument::from_bytes(&data).unwrap();
    doc.close();
    assert!(doc.read_indirect(unreferenced).is_err());
}
