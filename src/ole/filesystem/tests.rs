//! Write-then-read tests for compound file images.

use super::*;
use crate::ole::class_id::ClassId;
use crate::ole::consts::*;
use std::io::Cursor;

fn reopen(cf: &CompoundFile) -> CompoundFile {
    let bytes = cf.to_bytes().unwrap();
    assert_eq!(bytes.len() % 512, 0);
    CompoundFile::open(&bytes).unwrap()
}

#[test]
fn test_empty_file() {
    let bytes = CompoundFile::new().to_bytes().unwrap();
    assert_eq!(bytes.len(), MINIMAL_OLEFILE_SIZE);
    assert!(is_ole_file(&bytes));
    let cf = CompoundFile::open(&bytes).unwrap();
    assert!(cf.root().is_empty());
}

#[test]
fn test_small_and_large_streams() {
    let mut cf = CompoundFile::new();
    let root = cf.root_mut();
    root.create_document("Small1", b"Small".to_vec()).unwrap();
    root.create_document("Large1", vec![0xAA; 5000]).unwrap();
    root.create_document("Small2", b"Data".to_vec()).unwrap();
    root.create_document("Large2", vec![0xBB; 10000]).unwrap();
    root.create_document("Empty", Vec::new()).unwrap();
    root.create_document("Cutoff", vec![0xCC; MINI_STREAM_CUTOFF as usize]).unwrap();

    let cf = reopen(&cf);
    assert_eq!(cf.document(&["Small1"]).unwrap(), b"Small");
    assert_eq!(cf.document(&["Small2"]).unwrap(), b"Data");
    assert_eq!(cf.document(&["Large1"]).unwrap(), &[0xAA; 5000][..]);
    assert_eq!(cf.document(&["Large2"]).unwrap().len(), 10000);
    assert!(cf.document(&["Empty"]).unwrap().is_empty());
    assert_eq!(
        cf.document(&["Cutoff"]).unwrap().len(),
        MINI_STREAM_CUTOFF as usize
    );
}

#[test]
fn test_nested_storages_and_class_ids() {
    let clsid = ClassId::from_fields(0x00020820, 0, 0, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);
    let mut cf = CompoundFile::new();
    cf.root_mut().set_class_id(clsid);
    let objects = cf.root_mut().create_directory("ObjectPool").unwrap();
    objects.set_class_id(ClassId::from_bytes([7; 16]));
    objects
        .create_directory("_1234")
        .unwrap()
        .create_document("\u{1}Ole", vec![1, 2, 3])
        .unwrap();
    cf.root_mut().create_document("Workbook", vec![9; 600]).unwrap();

    let cf = reopen(&cf);
    assert_eq!(cf.root().class_id(), clsid);
    let objects = cf.root().directory("ObjectPool").unwrap();
    assert_eq!(objects.class_id(), ClassId::from_bytes([7; 16]));
    assert_eq!(
        cf.document(&["ObjectPool", "_1234", "\u{1}Ole"]).unwrap(),
        &[1, 2, 3]
    );
    assert!(matches!(
        cf.document(&["ObjectPool"]),
        Err(FilesystemError::NotADocument(_))
    ));
}

#[test]
fn test_many_entries_survive_tree_linking() {
    let mut cf = CompoundFile::new();
    for i in 0..40 {
        cf.root_mut()
            .create_document(&format!("Stream{i}"), vec![i as u8; i * 7])
            .unwrap();
    }
    let cf = reopen(&cf);
    assert_eq!(cf.root().len(), 40);
    for i in 0..40 {
        let data = cf.root().document(&format!("Stream{i}")).unwrap();
        assert_eq!(data, &vec![i as u8; i * 7][..]);
    }
}

#[test]
fn test_large_file_uses_difat() {
    // More than 109 FAT sectors of 128 entries each.
    let size = 110 * 128 * 512;
    let mut cf = CompoundFile::new();
    cf.root_mut().create_document("Big", vec![0x5A; size]).unwrap();
    let bytes = cf.to_bytes().unwrap();
    let difat_count = u32::from_le_bytes([bytes[72], bytes[73], bytes[74], bytes[75]]);
    assert!(difat_count >= 1);

    let cf = CompoundFile::open(&bytes).unwrap();
    let data = cf.document(&["Big"]).unwrap();
    assert_eq!(data.len(), size);
    assert!(data.iter().all(|&b| b == 0x5A));
}

#[test]
fn test_write_to_and_from_reader() {
    let mut cf = CompoundFile::new();
    cf.root_mut().create_document("Workbook", vec![1; 10]).unwrap();
    let mut out = Cursor::new(Vec::new());
    cf.write_to(&mut out).unwrap();
    let cf = CompoundFile::from_reader(Cursor::new(out.into_inner())).unwrap();
    assert_eq!(cf.document(&["Workbook"]).unwrap(), &[1; 10]);
}

#[test]
fn test_rejects_bad_images() {
    assert!(matches!(
        CompoundFile::open(b"not an ole file"),
        Err(FilesystemError::NotOleFile)
    ));

    let mut bytes = CompoundFile::new().to_bytes().unwrap();
    bytes[28] = 0xFF;
    bytes[29] = 0xFF;
    assert!(matches!(
        CompoundFile::open(&bytes),
        Err(FilesystemError::InvalidHeader(_))
    ));
}

#[test]
fn test_fat_loop_is_detected() {
    let mut cf = CompoundFile::new();
    cf.root_mut().create_document("Big", vec![1; 5000]).unwrap();
    let mut bytes = cf.to_bytes().unwrap();
    // The stream occupies sectors 0..10; point sector 1 back at sector 0.
    let fat_sector = u32::from_le_bytes([bytes[76], bytes[77], bytes[78], bytes[79]]) as usize;
    let entry = (fat_sector + 1) * 512 + 4;
    bytes[entry..entry + 4].copy_from_slice(&0u32.to_le_bytes());
    let err = CompoundFile::open(&bytes).unwrap_err();
    assert!(matches!(err, FilesystemError::Corrupted(_)), "{err}");
}

#[test]
fn test_wrong_format_hint_after_reload() {
    let mut cf = CompoundFile::new();
    cf.root_mut().create_document("WordDocument", vec![0; 8]).unwrap();
    let cf = reopen(&cf);
    let err = cf.document(&["Workbook"]).unwrap_err();
    assert!(err.to_string().contains("word-processing"));
}
