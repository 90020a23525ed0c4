mod ids;
mod notification;
mod playback;
mod selector;
mod track;

pub use ids::TrackId;
pub use notification::{FavoriteChange, MetadataEntity, NotificationHandle, NotificationState};
pub use playback::{
    PlaybackModes, PlaybackSession, PlaybackStatus, PlayerErrorKind, PositionInQueue, RepeatMode,
    ShuffleMode, SkipActions, SkipType,
};
pub use selector::{MediaCategory, SearchFocus, SearchHints, Selector};
pub use track::{QueueEntry, Track};
