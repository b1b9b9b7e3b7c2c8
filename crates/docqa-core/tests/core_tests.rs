use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docqa_core::data_processor::{load_extracted_dir, load_jsonl, DataProcessor};
use docqa_core::types::{Document, FileType};

#[test]
fn load_extracted_dir_maps_names_and_types() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("規程")).unwrap();
    fs::write(dir.join("規程/就業規則.docx.txt"), "第1条 この規則は職員の就業に関する事項を定める。").unwrap();
    fs::write(dir.join("勤務表.xlsx.txt"), "=== Sheet1 ===\n診療部 | 8:30 | 17:00").unwrap();
    fs::write(dir.join("notes.txt"), "memo").unwrap();
    fs::write(dir.join("empty.pdf.txt"), "   \n").unwrap();
    fs::write(dir.join("ignored.md"), "not an extract").unwrap();

    let docs = load_extracted_dir(dir).expect("load");
    let mut names: Vec<(&str, FileType)> = docs.iter().map(|d| (d.filename.as_str(), d.file_type)).collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    assert_eq!(
        names,
        vec![("notes", FileType::Unknown), ("勤務表.xlsx", FileType::Excel), ("就業規則.docx", FileType::Word)]
    );
}

#[test]
fn load_extracted_dir_missing_directory_is_not_found() {
    let tmp = TempDir::new().unwrap();
    assert!(load_extracted_dir(&tmp.path().join("nope")).is_err());
}

#[test]
fn load_jsonl_skips_malformed_and_blank_records() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("docs.jsonl");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, r#"{{"filename": "A.docx", "content": "本文A", "file_type": "Word"}}"#).unwrap();
    writeln!(f, "not json").unwrap();
    writeln!(f).unwrap();
    writeln!(f, r#"{{"filename": "B.pdf", "content": "  ", "file_type": "PDF"}}"#).unwrap();
    writeln!(f, r#"{{"filename": "C.xlsx", "raw_text": "本文C", "file_type": "excel"}}"#).unwrap();
    writeln!(f, r#"{{"filename": "D.bin", "content": "本文D", "file_type": "Visio"}}"#).unwrap();

    let docs = load_jsonl(&path).expect("load");
    let kinds: Vec<(&str, FileType)> = docs.iter().map(|d| (d.filename.as_str(), d.file_type)).collect();
    assert_eq!(kinds, vec![("A.docx", FileType::Word), ("C.xlsx", FileType::Excel), ("D.bin", FileType::Unknown)]);
}

#[test]
fn process_documents_keeps_ids_unique() {
    let processor = DataProcessor::new().expect("processor");
    let docs = vec![
        Document { filename: "A.docx".into(), file_type: FileType::Word, content: "古い版".into() },
        Document { filename: "B.xlsx".into(), file_type: FileType::Excel, content: "".into() },
        Document { filename: "A.docx".into(), file_type: FileType::Word, content: "新しい版".into() },
    ];
    let chunks = processor.process_documents(&docs);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "新しい版");
    assert_eq!(chunks[0].id(), "A.docx_0");
}
