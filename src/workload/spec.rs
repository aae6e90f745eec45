use serde::{Deserialize, Serialize};

/// Reproducible trace of a workload: the sessions to replay and the tick
/// geometry to replay them at. Timestamps are seconds from trace start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tick_seconds: Option<u64>,
    #[serde(default)]
    pub timescale: Option<f64>,
    pub sessions: Vec<SessionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSpec {
    pub id: String,
    pub start_secs: u64,
    #[serde(default)]
    pub stop_secs: Option<u64>,
    #[serde(default)]
    pub cpus: Option<f64>,
    #[serde(default)]
    pub memory_mb: Option<f64>,
    #[serde(default)]
    pub gpus: Option<u32>,
    #[serde(default)]
    pub gpu_kind: Option<String>,
    #[serde(default)]
    pub trainings: Vec<TrainingSpec>,
    #[serde(default)]
    pub gpu_util_updates: Vec<GpuUtilSpec>,
}

/// One simulated compute burst: a training start followed by a training end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSpec {
    pub start_secs: u64,
    pub end_secs: u64,
}

/// Advisory utilization sample emitted between training start and end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuUtilSpec {
    pub at_secs: u64,
    pub gpu_util: f64,
}
