use affinitymap::loader::{read_records, write_records};
use affinitymap::{Error, PartitionMap, NOT_FOUND};
use std::fs::File;
use std::io::{BufReader, Write};
use test_log::test;

#[test]
fn test_load_from_file() -> affinitymap::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partitions.txt");

    let records: Vec<_> = (1..=10_000).map(|k| (k, (k % 4) as u32)).collect();
    write_records(File::create(&path)?, records.iter().copied())?;

    let mut map = PartitionMap::new();
    let summary = map.init_from_path(&path)?;
    assert_eq!(summary.records, 10_000);
    assert_eq!(summary.distinct_keys, 10_000);

    for (key, partition) in records {
        assert_eq!(map.query(key), Some(partition));
    }
    assert_eq!(map.query(0), None);
    assert_eq!(map.query_or_sentinel(10_001), NOT_FOUND);

    let table = map.table().unwrap();
    assert!(table.load_factor() <= 0.75);
    Ok(())
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut map = PartitionMap::new();

    let err = map.init_from_path(dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    assert!(!map.is_populated());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_malformed_file_can_be_fixed_and_reloaded() -> affinitymap::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partitions.txt");
    std::fs::write(&path, "1\t0\n2\t1\n3 2\n4\t3\n")?;

    let mut map = PartitionMap::new();
    match map.init_from_path(&path) {
        Err(Error::Parse { line, reason }) => {
            assert_eq!(line, 3);
            assert!(reason.contains("3 2"), "{reason}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(!map.is_populated());
    assert_eq!(map.query(2), None);

    std::fs::write(&path, "1\t0\n2\t1\n3\t2\n4\t3\n")?;
    let summary = map.init_from_path(&path)?;
    assert!(!summary.already_loaded);
    assert_eq!(summary.records, 4);
    assert_eq!(map.query(2), Some(1));
    assert_eq!(map.query(3), Some(2));
    assert_eq!(map.query(4), Some(3));
    Ok(())
}

#[test]
fn test_duplicate_keys_keep_last_value() -> affinitymap::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "7\t1\n8\t2\n7\t3\r\n")?;

    let mut map = PartitionMap::new();
    let summary = map.init_from_path(file.path())?;
    assert_eq!(summary.records, 3);
    assert_eq!(summary.distinct_keys, 2);
    assert_eq!(map.query(7), Some(3));
    Ok(())
}

#[test]
fn test_reinit_from_other_file_is_ignored() -> affinitymap::Result<()> {
    let mut first = tempfile::NamedTempFile::new()?;
    write!(first, "1\t1\n")?;
    let mut second = tempfile::NamedTempFile::new()?;
    write!(second, "1\t2\n")?;

    let mut map = PartitionMap::new();
    map.init_from_path(first.path())?;
    let summary = map.init_from_path(second.path())?;

    assert!(summary.already_loaded);
    assert_eq!(map.query(1), Some(1));
    Ok(())
}

#[test]
fn test_file_round_trip_through_reader() -> affinitymap::Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    write_records(file.reopen()?, [(i64::MIN, 0), (-1, 1), (i64::MAX, u32::MAX)])?;

    let back = read_records(BufReader::new(file.reopen()?))
        .collect::<affinitymap::Result<Vec<_>>>()?;
    assert_eq!(back, vec![(i64::MIN, 0), (-1, 1), (i64::MAX, u32::MAX)]);
    Ok(())
}
