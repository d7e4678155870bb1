use serde::Serialize;
use serde_with::SerializeDisplay;
use strum_macros::Display;

/// Whether a listing entry is a directory or a file.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, SerializeDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// File type inferred from a file-name extension.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, SerializeDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    Text,
    Subghz,
    Rfid,
    Infrared,
    Nfc,
    Script,
    Application,
    Ibutton,
    Unknown,
}

impl FileType {
    /// Infers the type from the extension of `name`, ignoring case.
    ///
    /// ```
    /// use ntag::FileType;
    ///
    /// assert_eq!(FileType::Nfc, FileType::from_file_name("Card.NFC"));
    /// assert_eq!(FileType::Unknown, FileType::from_file_name("README"));
    /// ```
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        let Some((_stem, extension)) = name.rsplit_once('.') else {
            return Self::Unknown;
        };
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Self::Text,
            "sub" => Self::Subghz,
            "rfid" => Self::Rfid,
            "ir" => Self::Infrared,
            "nfc" => Self::Nfc,
            "js" => Self::Script,
            "fap" => Self::Application,
            "ibtn" => Self::Ibutton,
            _other => Self::Unknown,
        }
    }
}

/// One entry of a device directory listing.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DirectoryEntry {
    name: String,
    path: String,
    kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<FileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl DirectoryEntry {
    /// Returns the entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the absolute device path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns whether this is a directory or a file.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Returns the inferred file type; `None` for directories.
    #[must_use]
    pub const fn file_type(&self) -> Option<FileType> {
        self.file_type
    }

    /// Returns the reported size in bytes, when the device printed one.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Parses a `storage list` response into entries below `directory`.
///
/// Lines look like `[D] name` or `[F] name 1234b`; blank lines and prompt
/// remnants containing `>` are skipped.
pub(crate) fn parse_listing(directory: &str, response: &str) -> Vec<DirectoryEntry> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains('>'))
        .filter_map(|line| parse_listing_line(directory, line))
        .collect()
}

fn parse_listing_line(directory: &str, line: &str) -> Option<DirectoryEntry> {
    if let Some(name) = line.strip_prefix("[D]") {
        let name = name.trim().to_string();
        return Some(DirectoryEntry {
            path: join_device_path(directory, &name),
            name,
            kind: EntryKind::Directory,
            file_type: None,
            size: None,
        });
    }

    let rest = line.strip_prefix("[F]").map_or(line, str::trim);
    let (name, size) = split_size_suffix(rest);
    if name.is_empty() {
        return None;
    }
    Some(DirectoryEntry {
        path: join_device_path(directory, name),
        name: name.to_string(),
        kind: EntryKind::File,
        file_type: Some(FileType::from_file_name(name)),
        size,
    })
}

fn split_size_suffix(rest: &str) -> (&str, Option<u64>) {
    let Some((name, last)) = rest.rsplit_once(' ') else {
        return (rest, None);
    };
    match last
        .strip_suffix('b')
        .and_then(|digits| digits.parse::<u64>().ok())
    {
        Some(size) => (name.trim_end(), Some(size)),
        None => (rest, None),
    }
}

/// Joins a device directory and a child name, collapsing repeated `/`.
pub(crate) fn join_device_path(directory: &str, name: &str) -> String {
    let joined = format!("{directory}/{name}");
    let mut collapsed = String::with_capacity(joined.len());
    for character in joined.chars() {
        if character == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(character);
    }
    collapsed
}

/// Returns the parent directory of a device path, if it has one.
pub(crate) fn parent_directory(path: &str) -> Option<&str> {
    let (parent, _name) = path.trim_end_matches('/').rsplit_once('/')?;
    (!parent.is_empty()).then_some(parent)
}
