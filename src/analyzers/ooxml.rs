//! Helpers shared by the `.pptx` and `.xlsx` readers: zip entries,
//! relationship parts and attribute lookup.

use crate::utils::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

pub struct Package {
    archive: ZipArchive<File>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            archive: ZipArchive::new(file)?,
        })
    }

    /// Contents of a part, or `None` when the package does not have it.
    pub fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(Some(content))
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    /// Relationships of `part` keyed by id, with targets resolved to part names.
    pub fn relationships(&mut self, part: &str) -> Result<HashMap<String, Relationship>> {
        let (dir, file) = match part.rsplit_once('/') {
            Some((dir, file)) => (dir, file),
            None => ("", part),
        };
        let rels_name = if dir.is_empty() {
            format!("_rels/{}.rels", file)
        } else {
            format!("{}/_rels/{}.rels", dir, file)
        };

        let Some(xml) = self.read_part(&rels_name)? else {
            return Ok(HashMap::new());
        };

        let mut relationships = HashMap::new();
        let mut reader = Reader::from_str(&xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let (Some(id), Some(target)) = (attr(&e, "Id")?, attr(&e, "Target")?) else {
                        continue;
                    };
                    let rel_type = attr(&e, "Type")?.unwrap_or_default();
                    relationships.insert(
                        id,
                        Relationship {
                            rel_type,
                            target: resolve_target(dir, &target),
                        },
                    );
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(relationships)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn is_type(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// Value of attribute `name` (qualified, e.g. `r:id`), unescaped.
pub fn attr(element: &BytesStart, name: &str) -> Result<Option<String>> {
    match element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Resolves a relationship target against the directory of its source part.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
