use std::fmt::{self, Display, Formatter};

use crate::tag::TagImage;

use super::painter::Painter;
use super::table::Table;

/// Summarises a generated tag image as a key-value table.
pub(crate) struct TagImageView<'a> {
    image: &'a TagImage,
    location: &'a str,
    painter: &'a Painter,
}

impl<'a> TagImageView<'a> {
    pub(crate) fn new(image: &'a TagImage, location: &'a str, painter: &'a Painter) -> Self {
        Self {
            image,
            location,
            painter,
        }
    }
}

impl Display for TagImageView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let profile = self.image.profile();
        let table = Table::key_value(
            self.painter,
            vec![
                ("type", self.painter.value(profile.tag_type().to_string())),
                ("uid", self.painter.value(self.image.uid().to_string())),
                ("pages", self.painter.value(profile.page_count().to_string())),
                ("file", self.painter.value(self.location)),
            ],
        );
        write!(f, "{table}")
    }
}
