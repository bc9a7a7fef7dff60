use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use zip::ZipArchive;

use crate::{gtfs, problems::{ProblemKind, Reporter}};

/// Where the files of a feed are read from.
pub enum FeedSource {
    Zip(ZipArchive<File>),
    Directory(PathBuf),
}

impl FeedSource {
    /// Detects whether `path` is a zip archive or a directory.
    ///
    /// A missing path or a path of neither kind is reported and returned as
    /// an error; the load cannot go on without a feed.
    pub fn open(path: &Path, reporter: &mut Reporter) -> Result<Self, gtfs::Error> {
        let feed_name = path.display().to_string();
        if !path.exists() {
            reporter.report(ProblemKind::FeedNotFound {
                feed_name: feed_name.clone(),
            });
            return Err(gtfs::Error::FeedNotFound(feed_name));
        }
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        let is_zip = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"));
        if is_zip {
            let file = File::open(path)?;
            if let Ok(archive) = ZipArchive::new(file) {
                return Ok(Self::Zip(archive));
            }
        }
        reporter.report(ProblemKind::UnknownFormat {
            feed_name: feed_name.clone(),
        });
        Err(gtfs::Error::UnknownFormat(feed_name))
    }

    /// Names of every entry in the feed, sorted.
    pub fn file_names(&self) -> Result<Vec<String>, gtfs::Error> {
        let mut names: Vec<String> = match self {
            Self::Zip(archive) => archive.file_names().map(str::to_string).collect(),
            Self::Directory(path) => fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
        };
        names.sort();
        Ok(names)
    }

    pub fn has_file(&self, file_name: &str) -> bool {
        match self {
            Self::Zip(archive) => archive.index_for_name(file_name).is_some(),
            Self::Directory(path) => path.join(file_name).is_file(),
        }
    }

    /// Raw bytes of `file_name`, `None` when the feed has no such file.
    pub fn read(&mut self, file_name: &str) -> Result<Option<Vec<u8>>, gtfs::Error> {
        match self {
            Self::Zip(archive) => {
                let Some(index) = archive.index_for_name(file_name) else {
                    return Ok(None);
                };
                let mut file = archive.by_index(index)?;
                let mut contents = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut contents)?;
                Ok(Some(contents))
            }
            Self::Directory(path) => match fs::read(path.join(file_name)) {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            },
        }
    }
}
