//! Line-window fragmenter.
//!
//! Splits a file's content into consecutive, non-overlapping windows of up to
//! `fragment_lines` lines each, tracking the 0-indexed line offset of every
//! window so results can point back into the original file.

use crate::error::{Error, Result};
use crate::models::{TextFile, TextFileFragment};

/// Split a file into fixed-size line windows.
///
/// Windows are produced in file order; the final window may be shorter.
/// A trailing `\n` terminates the last line rather than opening a new blank
/// one, so `"a\nb\n"` is two lines, not three, and an empty file has no
/// lines at all. When `ignore_empty` is set, fragments whose joined content
/// is empty are dropped.
///
/// # Errors
///
/// `fragment_lines == 0` is rejected with [`Error::InvalidArgument`].
pub fn split_file(
    file: &TextFile,
    fragment_lines: usize,
    ignore_empty: bool,
) -> Result<Vec<TextFileFragment>> {
    if fragment_lines == 0 {
        return Err(Error::invalid_argument("fragment_lines must be > 0"));
    }

    let mut lines: Vec<&str> = file.contents.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }

    let mut fragments = Vec::new();
    for start in (0..lines.len()).step_by(fragment_lines) {
        let end = (start + fragment_lines).min(lines.len());
        let contents = lines[start..end].join("\n");
        if ignore_empty && contents.is_empty() {
            continue;
        }
        fragments.push(TextFileFragment {
            path: file.path.clone(),
            contents,
            start_line: start,
        });
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(contents: &str) -> TextFile {
        TextFile {
            path: PathBuf::from("a.py"),
            contents: contents.to_string(),
        }
    }

    fn numbered_lines(n: usize) -> String {
        (0..n)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_25_lines_in_windows_of_10() {
        let f = file(&numbered_lines(25));
        let fragments = split_file(&f, 10, true).unwrap();
        assert_eq!(fragments.len(), 3);
        let starts: Vec<usize> = fragments.iter().map(|fr| fr.start_line).collect();
        assert_eq!(starts, vec![0, 10, 20]);
        assert_eq!(fragments[0].line_count(), 10);
        assert_eq!(fragments[1].line_count(), 10);
        assert_eq!(fragments[2].line_count(), 5);
    }

    #[test]
    fn test_partition_reproduces_file() {
        for n in [1, 9, 10, 11, 30] {
            let contents = numbered_lines(n);
            let f = file(&contents);
            for width in [1, 3, 10, 50] {
                let fragments = split_file(&f, width, false).unwrap();
                let joined = fragments
                    .iter()
                    .map(|fr| fr.contents.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                assert_eq!(joined, contents, "n={} width={}", n, width);
            }
        }
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        // An empty file has no lines, so not even an empty fragment is
        // produced when ignore_empty is off.
        assert!(split_file(&file(""), 10, true).unwrap().is_empty());
        assert!(split_file(&file(""), 10, false).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_newline_terminates_last_line() {
        // "a\nb\n" is two lines; the terminator opens no third blank line.
        let fragments = split_file(&file("a\nb\n"), 10, true).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].contents, "a\nb");
        assert_eq!(fragments[0].line_count(), 2);
        assert_eq!(fragments[0].end_line(), 1);
    }

    #[test]
    fn test_terminated_and_unterminated_files_fragment_alike() {
        let with = split_file(&file(&(numbered_lines(25) + "\n")), 10, true).unwrap();
        let without = split_file(&file(&numbered_lines(25)), 10, true).unwrap();
        assert_eq!(with.len(), without.len());
        for (a, b) in with.iter().zip(&without) {
            assert_eq!(a.contents, b.contents);
            assert_eq!(a.start_line, b.start_line);
        }
    }

    #[test]
    fn test_blank_lines_inside_file_are_kept() {
        // A newline-only file holds two blank lines; their window joins to
        // "\n", which is non-empty and survives ignore_empty.
        let fragments = split_file(&file("\n\n"), 10, true).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].contents, "\n");
        assert_eq!(fragments[0].line_count(), 2);

        // With width 1 each blank line is its own empty window and is dropped.
        assert!(split_file(&file("\n\n"), 1, true).unwrap().is_empty());
    }

    #[test]
    fn test_zero_fragment_lines_rejected() {
        let err = split_file(&file("a"), 0, true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_start_lines_are_window_offsets() {
        let f = file(&numbered_lines(7));
        let fragments = split_file(&f, 3, true).unwrap();
        let starts: Vec<usize> = fragments.iter().map(|fr| fr.start_line).collect();
        assert_eq!(starts, vec![0, 3, 6]);
        assert_eq!(fragments[2].end_line(), 6);
    }
}
