//! Files the reader must refuse, and header edge cases

use grbfile::{
    read, read_path, write, write_path, BinaryMetadata, ElementType, Error, FormatError,
    MemoryEngine, MemoryMatrix, ReadOptions, SparseEngine, WriteOptions,
};
use grbfile_core::format::constants::HEADER_LEN;

/// Offset of the type code inside the metadata block
const TYPECODE_OFFSET: usize = 8 + 4 * 3 + 8 * 2 + 8 * 4;

fn small_matrix(engine: &MemoryEngine) -> MemoryMatrix {
    let mut matrix = engine.matrix_new(ElementType::Int64, 6, 6).unwrap();
    engine
        .build(&mut matrix, &[(0, 5, 10i64), (3, 3, -4), (5, 0, 8)])
        .unwrap();
    matrix
}

fn written(engine: &MemoryEngine, options: &WriteOptions) -> Vec<u8> {
    let mut matrix = small_matrix(engine);
    let mut bytes = Vec::new();
    write(engine, &mut matrix, &mut bytes, options).unwrap();
    bytes
}

#[test]
fn test_other_version_is_bad_magic() {
    let old = MemoryEngine::new().with_version(7, 4, 3);
    let bytes = written(&old, &WriteOptions::default());

    let engine = MemoryEngine::new();
    let err = read(&engine, bytes.as_slice()).unwrap_err();
    match err {
        Error::Format(FormatError::BadMagic { expected, found }) => {
            assert_eq!(expected, 9_003_001);
            assert_eq!(found, 7_004_003);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.live_matrices(), 0);
}

#[test]
fn test_corrupted_magic_stops_before_other_fields() {
    let engine = MemoryEngine::new();
    let mut bytes = written(&engine, &WriteOptions::default());
    bytes[HEADER_LEN + 3] ^= 0x5a;
    // Garbage after the magic must not matter
    for byte in &mut bytes[HEADER_LEN + 8..HEADER_LEN + BinaryMetadata::SIZE] {
        *byte = 0xff;
    }
    let err = read(&engine, bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::BadMagic { .. })));
}

#[test]
fn test_truncated_anywhere_is_an_error() {
    let engine = MemoryEngine::new();
    let bytes = written(&engine, &WriteOptions::default());
    for len in [0, 10, HEADER_LEN, HEADER_LEN + 4, HEADER_LEN + 40, bytes.len() - 8] {
        let err = read(&engine, &bytes[..len]).unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::Truncated)),
            "length {len}: {err}"
        );
    }
    assert_eq!(engine.live_matrices(), 0);
}

#[test]
fn test_unknown_type_code() {
    let engine = MemoryEngine::new();
    let mut bytes = written(&engine, &WriteOptions::default());
    let at = HEADER_LEN + TYPECODE_OFFSET;
    bytes[at..at + 4].copy_from_slice(&99i32.to_ne_bytes());

    let err = read(&engine, bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnknownTypeCode(99))));
}

#[test]
fn test_type_size_mismatch() {
    let engine = MemoryEngine::new();
    let mut bytes = written(&engine, &WriteOptions::default());
    let at = HEADER_LEN + TYPECODE_OFFSET + 4;
    bytes[at..at + 8].copy_from_slice(&4usize.to_ne_bytes());

    let err = read(&engine, bytes.as_slice()).unwrap_err();
    assert!(matches!(
        err,
        Error::Format(FormatError::TypeSizeMismatch { expected: 8, found: 4 })
    ));
}

#[test]
fn test_unknown_sparsity_status() {
    let engine = MemoryEngine::new();
    let mut bytes = written(&engine, &WriteOptions::default());
    let at = HEADER_LEN + 12;
    bytes[at..at + 4].copy_from_slice(&3i32.to_ne_bytes());

    let err = read(&engine, bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnknownSparsity(3))));
}

#[cfg(feature = "complex")]
#[test]
fn test_complex_needs_engine_support() {
    use num_complex::Complex64;

    let engine = MemoryEngine::new();
    let mut matrix = engine.matrix_new(ElementType::Fc64, 2, 2).unwrap();
    engine
        .build(&mut matrix, &[(0, 1, Complex64::new(1.0, -1.0))])
        .unwrap();
    let mut bytes = Vec::new();
    write(&engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap();

    let back = read(&engine, bytes.as_slice()).unwrap();
    assert_eq!(
        engine.get_element::<Complex64>(&back, 0, 1),
        Ok(Some(Complex64::new(1.0, -1.0)))
    );

    let plain = MemoryEngine::without_complex();
    let err = read(&plain, bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnknownTypeCode(12))));
    assert_eq!(plain.live_matrices(), 0);
}

#[test]
fn test_header_is_fixed_size_and_truncates_comments() {
    let engine = MemoryEngine::new();
    let long = "x".repeat(2000);
    let bytes = written(&engine, &WriteOptions::default().with_comment(long));

    assert_eq!(bytes[HEADER_LEN - 1], b'x');
    let metadata = BinaryMetadata::from_bytes(&bytes[HEADER_LEN..]).unwrap();
    assert_eq!(metadata.nvals, 3);
    assert!(read(&engine, bytes.as_slice()).is_ok());

    let short = written(&engine, &WriteOptions::default().with_comment("naïve"));
    assert_eq!(short.len(), bytes.len());
    let header = std::str::from_utf8(&short[..HEADER_LEN]).unwrap();
    assert!(header.contains("\nna??ve\n"));
    assert!(header.ends_with(' '));
}

#[test]
fn test_header_text_is_not_parsed() {
    let engine = MemoryEngine::new();
    let mut bytes = written(&engine, &WriteOptions::default());
    bytes[..HEADER_LEN].fill(0);

    let back = read(&engine, bytes.as_slice()).unwrap();
    assert_eq!(engine.nvals(&back), Ok(3));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MemoryEngine::new();
    let path = dir.path().join("absent.grb");
    let err = read_path(&engine, path, &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_fatal());
}

#[test]
fn test_unwritable_path_leaves_matrix_alone() {
    let dir = tempfile::tempdir().unwrap();
    let engine = MemoryEngine::new();
    let mut matrix = small_matrix(&engine);
    let path = dir.path().join("no/such/dir/out.grb");

    let err = write_path(&engine, &mut matrix, &path, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(engine.get_element::<i64>(&matrix, 3, 3), Ok(Some(-4)));
}
