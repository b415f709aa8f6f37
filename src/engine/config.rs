/// Engine-wide defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame rate of pipelines whose settings carry no `fps`.
    pub default_fps: f64,
    /// Lower bound on the delay between two ticks of one pipeline.
    pub min_reschedule_ms: f64,
    /// Time source used when a caller names none.
    pub default_time_type: String,
    /// Iteration cap of condition loops whose stage and settings give none.
    pub default_max_loop: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fps: 60.0,
            min_reschedule_ms: 2.0,
            default_time_type: "relative".to_owned(),
            default_max_loop: 100,
        }
    }
}
