//! Dataset types published in the bulk export and their CSV schemas

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// One of the fixed bulk-data categories in the export listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    Posts,
    Pools,
    Tags,
    TagAliases,
    TagImplications,
    WikiPages,
}

impl DatasetType {
    /// Every dataset type, in the order a cycle processes them
    pub const ALL: [DatasetType; 6] = [
        DatasetType::Posts,
        DatasetType::Pools,
        DatasetType::Tags,
        DatasetType::TagAliases,
        DatasetType::TagImplications,
        DatasetType::WikiPages,
    ];

    /// Name used as the file name prefix in the export listing
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetType::Posts => "posts",
            DatasetType::Pools => "pools",
            DatasetType::Tags => "tags",
            DatasetType::TagAliases => "tag_aliases",
            DatasetType::TagImplications => "tag_implications",
            DatasetType::WikiPages => "wiki_pages",
        }
    }

    /// Column names of the dump's header row
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            DatasetType::Posts => &[
                "id",
                "uploader_id",
                "created_at",
                "md5",
                "source",
                "rating",
                "image_width",
                "image_height",
                "tag_string",
                "locked_tags",
                "fav_count",
                "file_ext",
                "parent_id",
                "change_seq",
                "approver_id",
                "file_size",
                "comment_count",
                "description",
                "duration",
                "updated_at",
                "is_deleted",
                "is_pending",
                "is_flagged",
                "score",
                "up_score",
                "down_score",
                "is_rating_locked",
                "is_status_locked",
                "is_note_locked",
            ],
            DatasetType::Pools => &[
                "id",
                "name",
                "created_at",
                "updated_at",
                "creator_id",
                "description",
                "is_active",
                "category",
                "post_ids",
            ],
            DatasetType::Tags => &["id", "name", "category", "post_count"],
            DatasetType::TagAliases | DatasetType::TagImplications => {
                &["id", "antecedent_name", "consequent_name", "created_at", "status"]
            },
            DatasetType::WikiPages => &[
                "id",
                "created_at",
                "updated_at",
                "title",
                "body",
                "creator_id",
                "updater_id",
                "is_locked",
            ],
        }
    }

    /// Whether `file_name` is a dump of this type (`<type>-...`)
    pub fn matches_file(self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetType::ALL
            .into_iter()
            .find(|dataset| dataset.as_str() == s)
            .ok_or_else(|| IngestError::UnknownDataset(s.to_string()))
    }
}
