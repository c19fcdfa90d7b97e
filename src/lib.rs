// castfeed: the feed engagement core of the Cast civic social network.
//
// This is the library root. `feed` owns the ordered list for a level,
// `engagement` owns one item's optimistic likes/reposts/views/comments,
// `api` and `realtime` are the backend seams they depend on.

pub mod api;
pub mod config;
pub mod engagement;
pub mod feed;
pub mod output;
pub mod realtime;
pub mod session;
