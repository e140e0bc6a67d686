/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use segtrans::file_utils::FileManager;
use crate::common;

/// Test that only non-empty files count as done
#[test]
fn test_has_content_withEmptyAndFilledFiles_shouldOnlyAcceptFilled() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let empty = common::create_test_file(temp_dir.path(), "segment_1.txt", "")?;
    let filled = common::create_test_file(temp_dir.path(), "segment_2.txt", "xin chào")?;

    assert!(!FileManager::has_content(&empty));
    assert!(FileManager::has_content(&filled));
    assert!(!FileManager::has_content(temp_dir.path().join("segment_3.txt")));
    Ok(())
}

/// Test that segment files are ordered numerically, not lexically
#[test]
fn test_find_segment_files_withMixedNames_shouldSortBySequence() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::write_segments(temp_dir.path(), [10, 2, 1])?;
    common::create_test_file(temp_dir.path(), "notes.txt", "ignore me")?;
    common::create_test_file(temp_dir.path(), "segment_x.txt", "ignore me")?;

    let found = FileManager::find_segment_files(temp_dir.path())?;
    let seqs: Vec<u64> = found.iter().map(|(n, _)| *n).collect();
    assert_eq!(seqs, vec![1, 2, 10]);
    Ok(())
}

/// Test that segment numbers are parsed from the file name only
#[test]
fn test_segment_number_withVariousNames_shouldParseDigits() {
    assert_eq!(FileManager::segment_number("segment_42.txt"), Some(42));
    assert_eq!(FileManager::segment_number("Segment_7.TXT"), Some(7));
    assert_eq!(FileManager::segment_number("segment_.txt"), None);
    assert_eq!(FileManager::segment_number("chapter_1.txt"), None);
}

/// Test that writing creates missing parent folders
#[test]
fn test_write_to_file_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("nested").join("out").join("segment_1.txt");

    FileManager::write_to_file(&target, "bản dịch")?;
    assert_eq!(FileManager::read_to_string(&target)?, "bản dịch");
    Ok(())
}
