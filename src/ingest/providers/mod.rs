pub mod hn_algolia;
pub mod rss;
