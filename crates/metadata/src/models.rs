//! Database row types and conversions.

use granary_core::{FileMeta, FilePart};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A file row, in either the processing or the committed table.
#[derive(Clone, Debug, FromRow)]
pub struct FileRow {
    /// Unique file name.
    pub name: String,
    /// Total file length in bytes.
    pub content_length: i64,
    /// When the upload began.
    pub created_at: OffsetDateTime,
}

/// One part row; `position` preserves upload order.
#[derive(Clone, Debug, FromRow)]
pub struct FilePartRow {
    /// Owning file name.
    pub file_name: String,
    /// Zero-based position in reassembly order.
    pub position: i64,
    /// Backend host identifier.
    pub host: String,
    /// Blob path on that host.
    pub path: String,
    /// Part length in bytes.
    pub content_length: i64,
}

impl FilePartRow {
    /// Build the ordered part rows for a file's metadata.
    pub fn from_meta(meta: &FileMeta) -> Vec<Self> {
        meta.parts
            .iter()
            .enumerate()
            .map(|(position, part)| Self {
                file_name: meta.name.clone(),
                position: position as i64,
                host: part.host.clone(),
                path: part.path.clone(),
                content_length: part.content_length as i64,
            })
            .collect()
    }
}

/// Assemble domain metadata from a file row and its ordered part rows.
pub fn meta_from_rows(file: FileRow, parts: Vec<FilePartRow>) -> FileMeta {
    FileMeta {
        name: file.name,
        parts: parts
            .into_iter()
            .map(|row| FilePart {
                host: row.host,
                path: row.path,
                content_length: row.content_length as u64,
            })
            .collect(),
        content_length: file.content_length as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_conversion_preserves_order_and_lengths() {
        let meta = FileMeta::new("f", 10).with_parts(
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()],
            &[4, 3, 3],
        );

        let rows = FilePartRow::from_meta(&meta);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[2].position, 2);
        assert_eq!(rows[1].host, "s2");

        let file = FileRow {
            name: "f".to_string(),
            content_length: 10,
            created_at: OffsetDateTime::now_utc(),
        };
        let rebuilt = meta_from_rows(file, rows);
        assert_eq!(rebuilt, meta);
    }
}
