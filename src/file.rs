//! JSON file I/O for race archives and model artifacts.

use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::{fs, io::Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_reader, to_writer_pretty};

/// Reads a JSON-encoded type from the file at `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, io::Error> {
    let file = File::open(path)?;
    Ok(from_reader(file)?)
}

/// Writes a type JSON-encoded to the file at `path`, replacing any existing file.
pub fn write_json<S: Serialize>(value: &S, path: impl AsRef<Path>) -> Result<(), io::Error> {
    let mut file = File::create(path)?;
    to_writer_pretty(&mut file, value)?;
    file.flush()
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> Result<D, io::Error> {
        read_json(path)
    }
}

pub trait WriteJsonFile {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), io::Error>;
}

impl<S: Serialize> WriteJsonFile for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        write_json(self, path)
    }
}

/// Recursively locates all files under `path` whose extension passes `extension_filter`,
/// appending them to `files`. A matching `path` that is itself a file is also added.
pub fn recurse_dir(
    path: PathBuf,
    files: &mut Vec<PathBuf>,
    extension_filter: &mut impl FnMut(&OsStr) -> bool,
) -> Result<(), io::Error> {
    let md = fs::metadata(&path)?;
    if md.is_dir() {
        let entries = fs::read_dir(path)?;
        for entry in entries {
            recurse_dir(entry?.path(), files, extension_filter)?;
        }
    } else if extension_filter(path.extension().unwrap_or_default()) {
        files.push(path);
    }
    Ok(())
}
