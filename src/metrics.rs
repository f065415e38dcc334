use std::sync::LazyLock;

use prometheus::*;

static METRIC_RECOGNIZE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "fg_recognize_count",
        "count of recognition requests by outcome",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_RECOGNIZE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("fg_recognize_duration", "duration of one recognition in seconds")
        .unwrap()
});

static METRIC_GALLERY_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("fg_gallery_size", "number of faces in the current gallery").unwrap()
});

/// 按结果统计识别请求数量
pub fn inc_recognize(outcome: &str) {
    METRIC_RECOGNIZE_COUNT.with_label_values(&[outcome]).inc();
}

pub fn observe_recognize_duration(seconds: f64) {
    METRIC_RECOGNIZE_DURATION.observe(seconds);
}

pub fn set_gallery_size(size: usize) {
    METRIC_GALLERY_SIZE.set(size as i64);
}
