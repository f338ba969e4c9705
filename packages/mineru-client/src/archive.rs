//! Locating the structured result inside a MinerU result bundle.

use std::io::{Cursor, Read};

use serde_json::{Map, Value};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{MineruError, Result};

/// Entries MinerU writes the structured extraction into.
const RESULT_ENTRIES: [&str; 3] = ["content_list.json", "middle.json", "model.json"];

/// Extract the structured JSON result from a ZIP bundle held in memory.
///
/// Entries are scanned in archive order. The first entry named like one of the
/// known result files that parses as a JSON object wins; failing that, the first
/// `.json` entry that does. Arrays (such as `content_list.json`) are skipped.
pub fn extract_json_from_zip(bytes: &[u8]) -> Result<Value> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    if let Some(value) = first_parsable(&mut archive, |name| {
        RESULT_ENTRIES.iter().any(|target| name.ends_with(target))
    })? {
        return Ok(value);
    }

    first_parsable(&mut archive, |name| name.ends_with(".json"))?
        .ok_or(MineruError::NoJsonInArchive)
}

/// Parse a result document. Results are always JSON objects.
pub fn parse_object(bytes: &[u8]) -> Result<Value> {
    let object: Map<String, Value> = serde_json::from_slice(bytes)?;
    Ok(Value::Object(object))
}

fn first_parsable<F>(archive: &mut ZipArchive<Cursor<&[u8]>>, wanted: F) -> Result<Option<Value>>
where
    F: Fn(&str) -> bool,
{
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if !wanted(&name) {
            continue;
        }

        // The declared size comes from the archive and is not trusted
        let mut content = Vec::new();
        if let Err(e) = entry.read_to_end(&mut content) {
            debug!(entry = %name, error = %e, "skipping unreadable archive entry");
            continue;
        }

        match parse_object(&content) {
            Ok(value) => {
                debug!(entry = %name, "parsed result JSON from archive");
                return Ok(Some(value));
            }
            Err(e) => debug!(entry = %name, error = %e, "archive entry is not a JSON object"),
        }
    }
    Ok(None)
}
