use crate::config::EngineConfig;
use crate::item::UnixTimeMs;
use crate::sync::MapListSync;

pub struct Model {
    pub engine: MapListSync,
    /// Clock reading taken at the start of every update, used for
    /// relative time labels in the view.
    pub view_timestamp_ms: u64,
}

impl Model {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: MapListSync::new(config),
            view_timestamp_ms: UnixTimeMs::now().as_millis(),
        }
    }

    pub fn update_timestamp(&mut self) {
        self.view_timestamp_ms = UnixTimeMs::now().as_millis();
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
