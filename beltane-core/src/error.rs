use beltane_store::StoreError;
use beltane_types::TrackId;

/// Errors surfaced by the coordination core.
#[derive(Debug)]
pub enum CoreError {
    /// Snapshot fetch or distribution failure. Distribution is
    /// all-or-nothing: no partition has been touched when this surfaces.
    Load(String),
    /// Whole-composition save rejection.
    Save(String),
    /// The operation requires an active composition.
    NoActiveComposition,
    /// A partition edit targeted a track that does not exist.
    UnknownTrack(TrackId),
    /// A partition edit targeted an effect unit that does not exist.
    UnknownEffect(TrackId, u32),
    /// Persistence service failure outside the load/save paths.
    Store(StoreError),
    /// Bus transport failure.
    Bus(std::io::Error),
    /// A broadcast payload could not be decoded.
    Decode(serde_json::Error),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Load(msg) => write!(f, "load failed: {}", msg),
            CoreError::Save(msg) => write!(f, "save failed: {}", msg),
            CoreError::NoActiveComposition => write!(f, "no composition is active"),
            CoreError::UnknownTrack(id) => write!(f, "track {} does not exist", id),
            CoreError::UnknownEffect(track, unit) => {
                write!(f, "effect unit {} on track {} does not exist", unit, track)
            }
            CoreError::Store(e) => write!(f, "{}", e),
            CoreError::Bus(e) => write!(f, "bus error: {}", e),
            CoreError::Decode(e) => write!(f, "bad broadcast payload: {}", e),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Store(e) => Some(e),
            CoreError::Bus(e) => Some(e),
            CoreError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Store(e)
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Bus(e)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Decode(e)
    }
}
