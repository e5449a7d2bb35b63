//! Compressed thread archives.
//!
//! A thread is stored as a JSON array of post records, deflated inside a
//! zip container holding a single `thread.json` entry.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::Error;
use crate::model::Thread;

const ENTRY_NAME: &str = "thread.json";

/// Encode a thread into archive bytes.
pub fn encode(thread: &Thread) -> Result<Vec<u8>, Error> {
    let json = serde_json::to_vec(thread)?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(ENTRY_NAME, options)?;
    zip.write_all(&json)?;
    let cursor = zip.finish()?;

    Ok(cursor.into_inner())
}

/// Decode archive bytes back into a thread.
pub fn decode(bytes: &[u8]) -> Result<Thread, Error> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = archive.by_name(ENTRY_NAME)?;

    let mut json = Vec::new();
    entry.read_to_end(&mut json)?;

    Ok(serde_json::from_slice(&json)?)
}

/// Write a thread archive to `path`, replacing any existing file.
pub fn store_thread(thread: &Thread, path: impl AsRef<Path>) -> Result<(), Error> {
    let bytes = encode(thread)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(&bytes)?;

    tracing::debug!("stored {} posts to {}", thread.len(), path.as_ref().display());
    Ok(())
}

/// Read a thread archive from `path`.
pub fn load_thread(path: impl AsRef<Path>) -> Result<Thread, Error> {
    let mut bytes = Vec::new();
    File::open(path.as_ref())?.read_to_end(&mut bytes)?;
    decode(&bytes)
}
