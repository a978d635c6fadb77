//! Test doubles shared by unit and integration tests.

mod mock_xkcd;

pub use mock_xkcd::{comic_info, MockComicSource};
