use std::fs;

use pes_core::core_api::{AttributeStore, CoreErrorCode, NameTable, create_backup};
use pes_core::layout::RecordLayout;
use pes_core::scanner::{IdCandidates, ScanHit, WidthClass, find_block};

const JULIO_CESAR: u64 = 41188;

fn player_data_fixture() -> Vec<u8> {
    let mut bytes = vec![0u8; 64 * 4 + 10];
    // decoy: the id spread over a 4-byte candidate nobody ranks
    bytes[0x30..0x34].copy_from_slice(&(JULIO_CESAR as u32).to_le_bytes());

    let block = 2 * 64;
    bytes[block + 0xE..block + 0x10].copy_from_slice(&(JULIO_CESAR as u16).to_le_bytes());
    bytes[block + 0x10] = 88;
    bytes[block + 0x11] = 45;
    bytes[block + 0x12] = 80;
    bytes[block + 0x13] = 70;
    bytes[block + 0x14] = 60;
    bytes
}

#[test]
fn scanner_matches_documented_example() {
    let mut buffer = vec![0x11u8; 12];
    buffer[8 + 2] = 0x07;
    buffer[8 + 3] = 0x00;
    let candidates = IdCandidates::new(vec![WidthClass {
        width: 2,
        offsets: vec![0, 2],
    }])
    .expect("valid candidates");

    let hit = find_block(&buffer, 4, 7, &candidates).expect("id 7 is in block 2");
    assert_eq!(
        hit,
        ScanHit {
            block_index: 2,
            block_offset: 8,
            id_offset: 2,
            id_width: 2,
        }
    );
}

#[test]
fn lookup_decodes_flat_record() {
    let store = AttributeStore::from_bytes(player_data_fixture(), RecordLayout::player_data())
        .expect("preset validates");
    let mut names = NameTable::default();
    names.insert(JULIO_CESAR, "Julio Cesar");

    let record = store
        .lookup(JULIO_CESAR, &IdCandidates::player_data(), Some(&names))
        .expect("player present");

    assert_eq!(record.name, "Julio Cesar");
    assert_eq!(record.hit.block_index, 2);
    assert_eq!(record.hit.block_offset, 128);
    assert_eq!(record.hit.id_offset, 0xE);
    assert_eq!(record.hit.id_width, 2);
    assert_eq!(record.attributes.get("attack"), Some(88));
    assert_eq!(record.attributes.get("dribble_accuracy"), Some(60));
    assert_eq!(record.raw_block.len(), 64);
    assert!(record.raw_hex().starts_with("0000000000000000000000000000e4a0"));
}

#[test]
fn lookup_without_names_reports_unknown() {
    let store = AttributeStore::from_bytes(player_data_fixture(), RecordLayout::player_data())
        .expect("preset validates");
    let record = store
        .lookup(JULIO_CESAR, &IdCandidates::player_data(), None)
        .expect("player present");
    assert_eq!(record.name, NameTable::UNKNOWN);

    assert!(store.lookup(12345, &IdCandidates::player_data(), None).is_none());
}

#[test]
fn find_by_id_indexes_from_start_offset() {
    let layout = RecordLayout::bit_packed("offset", 8, 5, [("A", 8)]);
    let mut bytes = vec![0xFFu8; 5 + 3 * 8];
    for block in 0..3 {
        bytes[5 + block * 8..5 + block * 8 + 8].fill(0);
    }
    bytes[5 + 8 + 4..5 + 8 + 6].copy_from_slice(&513u16.to_le_bytes());
    bytes[5 + 8] = 42;

    let mut store = AttributeStore::from_bytes(bytes, layout).expect("layout validates");
    let candidates = IdCandidates::new(vec![WidthClass {
        width: 2,
        offsets: vec![4],
    }])
    .expect("valid candidates");

    let hit = store.find_by_id(513, &candidates).expect("id present");
    assert_eq!(hit.block_index, 1);
    assert_eq!(hit.block_offset, 13);
    assert_eq!(store.get_attributes(hit.block_index).and_then(|a| a.get("A")), Some(42));

    store
        .set_attributes(hit.block_index, [("A", 7)])
        .expect("block exists");
    assert_eq!(store.bytes()[13], 7);
}

#[test]
fn edit_after_lookup_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("unnamed_0075.bin");
    fs::write(&path, player_data_fixture()).expect("write fixture");

    let mut store = AttributeStore::load(&path, RecordLayout::player_data()).expect("load");
    let hit = store
        .find_by_id(JULIO_CESAR, &IdCandidates::player_data())
        .expect("player present");
    let report = store
        .set_attributes(
            hit.block_index,
            [("attack", 99), ("defense", 99), ("stamina", 99)],
        )
        .expect("block exists");
    assert!(report.is_complete());
    store.save().expect("save in place");

    let reloaded = AttributeStore::load(&path, RecordLayout::player_data()).expect("reload");
    let record = reloaded
        .lookup(JULIO_CESAR, &IdCandidates::player_data(), None)
        .expect("player still present");
    assert_eq!(record.attributes.get("attack"), Some(99));
    assert_eq!(record.attributes.get("top_speed"), Some(70));
}

#[test]
fn name_table_loads_from_csv_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("players.csv");
    fs::write(&path, "id,Name,Nationality\n41188,Julio Cesar,Brazil\nx,Bad Row,-\n")
        .expect("write csv");

    let table = NameTable::load_csv(&path).expect("load csv");
    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup(JULIO_CESAR), "Julio Cesar");

    let err = NameTable::load_csv(&dir.path().join("missing.csv")).expect_err("missing");
    assert_eq!(err.code, CoreErrorCode::NotFound);
}

#[test]
fn backup_copies_file_into_new_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("unnamed_0075.bin");
    fs::write(&source, [1u8, 2, 3]).expect("write fixture");
    let backups = dir.path().join("backups");

    let copy = create_backup(&source, &backups).expect("backup");
    assert_eq!(copy.parent(), Some(backups.as_path()));
    let file_name = copy
        .file_name()
        .and_then(|n| n.to_str())
        .expect("utf-8 file name");
    assert!(file_name.starts_with("unnamed_0075_"));
    assert!(file_name.ends_with(".bin"));
    assert_eq!(fs::read(&copy).expect("read backup"), vec![1, 2, 3]);
}

#[test]
fn backup_of_missing_file_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = create_backup(&dir.path().join("nope.bin"), &dir.path().join("backups"))
        .expect_err("source missing");
    assert_eq!(err.code, CoreErrorCode::NotFound);
    assert!(!dir.path().join("backups").exists());
}
