//! Units of work handed to the processors.

use std::fmt;
use std::path::PathBuf;

/// Asset category a file is processed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Image,
    Stylesheet,
    Script,
}

impl AssetCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Stylesheet => "stylesheets",
            Self::Script => "scripts",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One file to transform: where it comes from, where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: AssetCategory,
}

impl FileTask {
    /// File name used in log lines
    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}
