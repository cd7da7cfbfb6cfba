pub mod rss;

pub use rss::{http_client, parse_feed, RssProvider};
