//! Read-side views over a session's upload history

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::{Session, UploadRecord};

/// Folder label for names without a `/`
pub const ROOT_FOLDER: &str = "root";

/// Folder a name belongs to: everything before the last `/`
///
/// # Examples
///
/// ```
/// use blobpilot::query::folder_key;
///
/// assert_eq!(folder_key("docs/report.txt"), "docs");
/// assert_eq!(folder_key("a/b/c.bin"), "a/b");
/// assert_eq!(folder_key("readme.txt"), "root");
/// ```
pub fn folder_key(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[..pos],
        None => ROOT_FOLDER,
    }
}

/// Group records by folder, keeping history order inside each folder
pub fn group_by_folder(uploads: &[UploadRecord]) -> BTreeMap<String, Vec<UploadRecord>> {
    let mut folders: BTreeMap<String, Vec<UploadRecord>> = BTreeMap::new();
    for record in uploads {
        folders
            .entry(folder_key(&record.name).to_string())
            .or_default()
            .push(record.clone());
    }
    folders
}

/// Everything the list view shows for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadListing {
    /// Flat history in insertion order
    pub uploads: Vec<UploadRecord>,
    /// Same records grouped by folder
    pub folders: BTreeMap<String, Vec<UploadRecord>>,
    /// Number of records
    pub count: usize,
    /// Account address
    pub address: String,
}

impl UploadListing {
    /// Build the listing for a session
    pub fn from_session(session: &Session) -> Self {
        Self {
            folders: group_by_folder(&session.uploads),
            count: session.uploads.len(),
            uploads: session.uploads.clone(),
            address: session.address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_key_edge_cases() {
        assert_eq!(folder_key("/leading.txt"), "");
        assert_eq!(folder_key("trailing/"), "trailing");
        assert_eq!(folder_key(""), ROOT_FOLDER);
    }

    #[test]
    fn test_group_by_folder() {
        let uploads = vec![
            UploadRecord::imported("docs/report.txt"),
            UploadRecord::imported("readme.txt"),
            UploadRecord::imported("docs/notes.txt"),
        ];
        let folders = group_by_folder(&uploads);

        assert_eq!(folders.len(), 2);
        let docs: Vec<&str> = folders["docs"].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(docs, vec!["docs/report.txt", "docs/notes.txt"]);
        assert_eq!(folders[ROOT_FOLDER][0].name, "readme.txt");
    }
}
