//! Ground truth from the corpus layout.
//!
//! Images live in `<root>/<label>/<file>`. The file name carries a marker
//! saying whether the image is for enrollment or for evaluation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("{path}: no parent directory to take the label from")]
    NoParent { path: String },
    #[error("{path}: directory name is not valid UTF-8")]
    NotUtf8 { path: String },
    #[error("split markers must not be empty")]
    EmptyMarker,
    #[error("split markers {train:?} and {test:?} overlap")]
    OverlappingMarkers { train: String, test: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// File-name markers routing images to a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Convention {
    pub train_marker: String,
    pub test_marker: String,
}

impl Default for Convention {
    fn default() -> Self {
        Self {
            train_marker: "01".to_string(),
            test_marker: "02".to_string(),
        }
    }
}

impl Convention {
    pub fn validate(&self) -> Result<(), LabelError> {
        let (train, test) = (&self.train_marker, &self.test_marker);
        if train.is_empty() || test.is_empty() {
            return Err(LabelError::EmptyMarker);
        }
        if train.contains(test.as_str()) || test.contains(train.as_str()) {
            return Err(LabelError::OverlappingMarkers {
                train: train.clone(),
                test: test.clone(),
            });
        }
        Ok(())
    }

    /// Which split a file belongs to. Names with neither or both markers
    /// belong to no split.
    pub fn split(&self, path: &Path) -> Option<Split> {
        let name = path.file_name()?.to_string_lossy();
        let train = name.contains(self.train_marker.as_str());
        let test = name.contains(self.test_marker.as_str());
        match (train, test) {
            (true, false) => Some(Split::Train),
            (false, true) => Some(Split::Test),
            _ => None,
        }
    }

    pub fn is_train(&self, path: &Path) -> bool {
        self.split(path) == Some(Split::Train)
    }

    pub fn is_test(&self, path: &Path) -> bool {
        self.split(path) == Some(Split::Test)
    }
}

/// The label of an image is the name of the directory that contains it.
pub fn label_for(path: &Path) -> Result<String, LabelError> {
    let dir = path
        .parent()
        .and_then(|p| p.file_name())
        .ok_or_else(|| LabelError::NoParent {
            path: path.display().to_string(),
        })?;
    dir.to_str()
        .map(str::to_owned)
        .ok_or_else(|| LabelError::NotUtf8 {
            path: path.display().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_parent_directory() {
        let path = Path::new("images/Alice_Smith/Alice_Smith_01.jpg");
        assert_eq!(label_for(path).unwrap(), "Alice_Smith");
    }

    #[test]
    fn label_needs_a_directory() {
        assert!(matches!(
            label_for(Path::new("lonely.jpg")),
            Err(LabelError::NoParent { .. })
        ));
        assert!(matches!(
            label_for(Path::new("/lonely.jpg")),
            Err(LabelError::NoParent { .. })
        ));
    }

    #[test]
    fn split_looks_at_file_name_only() {
        let conv = Convention::default();
        assert_eq!(conv.split(Path::new("images/bob/bob_01.png")), Some(Split::Train));
        assert_eq!(conv.split(Path::new("images/bob/bob_02.png")), Some(Split::Test));
        assert_eq!(conv.split(Path::new("images/2002/bob_01.png")), Some(Split::Train));
        assert_eq!(conv.split(Path::new("images/bob/bob.png")), None);
        assert_eq!(conv.split(Path::new("images/bob/bob_0102.png")), None);
    }

    #[test]
    fn custom_markers() {
        let conv = Convention {
            train_marker: "enroll".into(),
            test_marker: "query".into(),
        };
        assert!(conv.is_train(Path::new("x/carol/enroll.jpg")));
        assert!(conv.is_test(Path::new("x/carol/query.jpg")));
        assert!(conv.validate().is_ok());
    }

    #[test]
    fn overlapping_markers_are_invalid() {
        let conv = Convention {
            train_marker: "01".into(),
            test_marker: "1".into(),
        };
        assert_eq!(
            conv.validate(),
            Err(LabelError::OverlappingMarkers {
                train: "01".into(),
                test: "1".into(),
            })
        );
    }

    #[test]
    fn empty_marker_is_invalid() {
        let conv = Convention {
            train_marker: String::new(),
            test_marker: "02".into(),
        };
        assert_eq!(conv.validate(), Err(LabelError::EmptyMarker));
    }
}
