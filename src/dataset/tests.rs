use super::*;

#[test]
fn test_descriptor_total_pixels() {
    let descriptor = DatasetDescriptor::new(
        "/data",
        vec!["a.bin".to_string(), "b.bin".to_string(), "c.bin".to_string()],
        vec![10, 0, 5],
        100,
        SampleEncoding::Float32,
    )
    .unwrap();

    assert_eq!(descriptor.total_pixels(), 15);
    assert_eq!(descriptor.file_count(), 3);
    assert_eq!(descriptor.row_bytes(), 400);
    assert_eq!(
        descriptor.file_path(1).unwrap(),
        std::path::PathBuf::from("/data/b.bin")
    );
    assert!(descriptor.file_path(3).is_none());
}

#[test]
fn test_descriptor_rejects_mismatched_rows() {
    let result = DatasetDescriptor::new(
        "/data",
        vec!["a.bin".to_string()],
        vec![1, 2],
        10,
        SampleEncoding::Float64,
    );
    assert!(matches!(
        result,
        Err(DatasetError::RowCountMismatch {
            files: 1,
            row_counts: 2
        })
    ));
}

#[test]
fn test_descriptor_rejects_zero_channels() {
    let result = DatasetDescriptor::in_memory(vec![1], 0);
    assert!(matches!(result, Err(DatasetError::NoMassChannels)));
}

#[test]
fn test_descriptor_rejects_empty_file_id() {
    let result = DatasetDescriptor::new(
        "/data",
        vec!["a.bin".to_string(), String::new()],
        vec![1, 1],
        10,
        SampleEncoding::Float64,
    );
    assert!(matches!(result, Err(DatasetError::EmptyFileId(1))));
}

#[test]
fn test_pixel_index_global_and_locate() {
    let index = PixelIndex::from_row_counts(&[3, 0, 2, 4]).unwrap();
    assert_eq!(index.total(), 9);
    assert_eq!(index.global_index(0, 0), Some(0));
    assert_eq!(index.global_index(0, 2), Some(2));
    assert_eq!(index.global_index(0, 3), None);
    assert_eq!(index.global_index(1, 0), None);
    assert_eq!(index.global_index(2, 1), Some(4));
    assert_eq!(index.global_index(3, 3), Some(8));
    assert_eq!(index.global_index(4, 0), None);

    // Empty file 1 is skipped when locating
    assert_eq!(index.locate(3), Some((2, 0)));
    assert_eq!(index.locate(8), Some((3, 3)));
    assert_eq!(index.locate(9), None);
}

#[test]
fn test_pixel_index_empty() {
    let index = PixelIndex::from_row_counts(&[]).unwrap();
    assert_eq!(index.total(), 0);
    assert_eq!(index.file_count(), 0);
    assert_eq!(index.locate(0), None);
}

#[test]
fn test_pixel_index_overflow() {
    assert!(PixelIndex::from_row_counts(&[usize::MAX, 1]).is_none());
}

#[test]
fn test_encoding_tags() {
    assert_eq!("float".parse::<SampleEncoding>().unwrap(), SampleEncoding::Float32);
    assert_eq!("Double".parse::<SampleEncoding>().unwrap(), SampleEncoding::Float64);
    assert_eq!("integer".parse::<SampleEncoding>().unwrap(), SampleEncoding::Int32);
    assert_eq!("short".parse::<SampleEncoding>().unwrap(), SampleEncoding::Int16);
    assert!("complex".parse::<SampleEncoding>().is_err());

    for encoding in [
        SampleEncoding::Int16,
        SampleEncoding::Int32,
        SampleEncoding::Float32,
        SampleEncoding::Float64,
    ] {
        assert_eq!(encoding.tag().parse::<SampleEncoding>().unwrap(), encoding);
    }
}

#[test]
fn test_integer_encoding_rounds_and_saturates() {
    let mut bytes = Vec::new();
    SampleEncoding::Int16.encode_into(&[1.6, -2.4, 1.0e9], &mut bytes);
    assert_eq!(bytes.len(), 6);

    let mut decoded = [0.0; 3];
    SampleEncoding::Int16.decode_into(&bytes, &mut decoded);
    assert_eq!(decoded, [2.0, -2.0, i16::MAX as f64]);
}

#[test]
fn test_float32_encoding_precision() {
    let mut bytes = Vec::new();
    SampleEncoding::Float32.encode_into(&[0.1, 1234.5], &mut bytes);

    let mut decoded = [0.0; 2];
    SampleEncoding::Float32.decode_into(&bytes, &mut decoded);
    assert!((decoded[0] - 0.1).abs() < 1e-7);
    assert_eq!(decoded[1], 1234.5);
}
