//! Relay of first-input comments into the output metadata.

use log::info;

use crate::formats::parquet::ParquetTable;

/// Longest comment, in bytes, that is copied to the output.
pub const MAX_COMMENT_LENGTH: usize = 1024;

/// Key under which the `n`-th relayed comment is stored.
pub fn comment_key(n: usize) -> String {
    format!("comment.{}", n)
}

/// Select the comments to relay.
///
/// Returns nothing when relaying is disabled. Comments longer than
/// [`MAX_COMMENT_LENGTH`] bytes are skipped.
pub fn select_comments<'a, I>(comments: I, enabled: bool) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if !enabled {
        info!("Abandon comments");
        return Vec::new();
    }

    comments
        .into_iter()
        .filter(|text| {
            if text.len() > MAX_COMMENT_LENGTH {
                info!("Skipping long comment ({} bytes)", text.len());
                false
            } else {
                true
            }
        })
        .collect()
}

/// Write the selected comments as named metadata records on the table.
///
/// Returns the number of records written.
pub fn relay_comments<'a, I>(comments: I, enabled: bool, table: &mut ParquetTable) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let selected = select_comments(comments, enabled);
    for (n, text) in selected.iter().enumerate() {
        table.write_metadata(comment_key(n), text);
    }
    if enabled {
        info!("Relayed {} comment(s)", selected.len());
    }
    selected.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_boundary() {
        let at_limit = "a".repeat(MAX_COMMENT_LENGTH);
        let over_limit = "b".repeat(MAX_COMMENT_LENGTH + 1);
        let selected = select_comments([at_limit.as_str(), over_limit.as_str()], true);
        assert_eq!(selected, vec![at_limit.as_str()]);
    }

    #[test]
    fn test_disabled_relays_nothing() {
        let selected = select_comments(["run 42", "detector config A"], false);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let selected = select_comments(["first", "second", ""], true);
        assert_eq!(selected, vec!["first", "second", ""]);
    }

    #[test]
    fn test_length_counts_bytes() {
        // 512 two-byte characters = 1024 bytes, one more puts it over
        let fits = "é".repeat(512);
        let over = "é".repeat(513);
        let selected = select_comments([fits.as_str(), over.as_str()], true);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_comment_keys() {
        assert_eq!(comment_key(0), "comment.0");
        assert_eq!(comment_key(12), "comment.12");
    }
}
