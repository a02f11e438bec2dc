//! Pipeline configuration (SPEC_FULL §D): cadence thresholds and file-review
//! bounds are configuration, not constants, but carry the spec's defaults.

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// §4.10 step 4: cap at 500 files (exceeding -> skip).
    pub max_files: usize,
    /// §4.10 step 7 / §5: 20-30 files per batch.
    pub batch_size_min: usize,
    pub batch_size_max: usize,
    /// §5: file analysis semaphore size (<=20 files in flight).
    pub max_concurrent_files: usize,
    /// §4.10 suggestion filtering: LLM chunk retry.
    pub llm_retry_attempts: u32,
    pub llm_retry_max_delay_ms: u64,
    /// §5: `maxConcurrentChunks` (default 10) with inter-batch delay.
    pub max_concurrent_chunks: usize,
    pub inter_batch_delay_ms: u64,
    /// Cadence defaults (AUTO_PAUSE burst rule).
    pub pushes_to_trigger: usize,
    pub time_window_minutes: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_files: 500,
            batch_size_min: 20,
            batch_size_max: 30,
            max_concurrent_files: 20,
            llm_retry_attempts: 3,
            llm_retry_max_delay_ms: 10_000,
            max_concurrent_chunks: 10,
            inter_batch_delay_ms: 2_000,
            pushes_to_trigger: 3,
            time_window_minutes: 15,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_batch_size(mut self, min: usize, max: usize) -> Self {
        self.batch_size_min = min;
        self.batch_size_max = max;
        self
    }

    pub fn with_cadence(mut self, pushes_to_trigger: usize, time_window_minutes: i64) -> Self {
        self.pushes_to_trigger = pushes_to_trigger;
        self.time_window_minutes = time_window_minutes;
        self
    }
}
