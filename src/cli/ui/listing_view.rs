use std::fmt::{self, Display, Formatter};

use crate::hw::{DirectoryEntry, EntryKind};

use super::painter::Painter;
use super::table::Table;

/// Renders a directory listing as a table.
pub(crate) struct DirectoryListingView<'a> {
    entries: &'a [DirectoryEntry],
    painter: &'a Painter,
}

impl<'a> DirectoryListingView<'a> {
    pub(crate) fn new(entries: &'a [DirectoryEntry], painter: &'a Painter) -> Self {
        Self { entries, painter }
    }
}

impl Display for DirectoryListingView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "{}", self.painter.muted("(empty)"));
        }

        let rows = self
            .entries
            .iter()
            .map(|entry| {
                let name = match entry.kind() {
                    EntryKind::Directory => self.painter.path(format!("{}/", entry.name())),
                    EntryKind::File => entry.name().to_string(),
                };
                vec![
                    name,
                    entry
                        .file_type()
                        .map_or_else(|| "-".to_string(), |file_type| file_type.to_string()),
                    entry
                        .size()
                        .map_or_else(|| "-".to_string(), |size| size.to_string()),
                ]
            })
            .collect();
        write!(f, "{}", Table::grid(["name", "type", "size"], rows))
    }
}
