//! `playlog-fetch`: pulls one page of recently-played items for the
//! configured user.

pub mod source;
pub mod spotify;

pub use source::{FetchError, RecentlyPlayedSource};
pub use spotify::SpotifyClient;
