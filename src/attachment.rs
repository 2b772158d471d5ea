use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::{MailError, MailResult, ValidationError};

/// A local file to be sent along with a message. The file is only touched by [`Attachment::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: PathBuf,
    display_name: String,
}

impl Attachment {
    /// Uses the final path segment as display name unless `name` is given
    pub fn new(path: impl Into<PathBuf>, name: Option<&str>) -> MailResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }
        let display_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => Self::final_segment(&path),
        };
        Ok(Self { path, display_name })
    }

    fn final_segment(path: &Path) -> String {
        match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => path.to_string_lossy().into_owned(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Reads the whole file, the handle is closed before returning
    pub fn read(&self) -> MailResult<Vec<u8>> {
        debug!("Reading attachment {:?}", self.path);
        fs::read(&self.path).map_err(|source| MailError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
