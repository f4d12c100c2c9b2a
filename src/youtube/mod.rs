// YouTube Data API integration — video-ID extraction and the stats client.

pub mod client;
pub mod url;
