mod image_view;
mod listing_view;
mod painter;
mod table;

pub(crate) use self::image_view::TagImageView;
pub(crate) use self::listing_view::DirectoryListingView;
pub(crate) use self::painter::Painter;
