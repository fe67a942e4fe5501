//! Time-based progress estimation.
//!
//! The work inside a stage is not instrumented, so progress within a stage is
//! approximated from elapsed time against an expected stage duration. The
//! estimate only ever moves toward a stage's ceiling; reaching it requires an
//! explicit stage completion.
//!
//! Once the estimate has stopped moving (it sits at its cap, or a slow stage
//! outlives its expected duration), a slow trickle keeps nudging progress into
//! the remaining headroom so the signal never looks frozen.

use std::time::Duration;

use super::config::OrchestratorConfig;
use super::types::Stage;

/// Distance below a stage ceiling the estimate is held at.
pub const STAGE_CEILING_MARGIN: f64 = 0.1;

/// Share of a stage the time-based estimate may cover (percent).
const STAGE_CAP_PERCENT: f64 = 90.0;

/// Upper bound of the anti-stall trickle (percent of the stage).
const TRICKLE_CAP_PERCENT: f64 = 97.0;

/// Trickle speed: one percent of the stage per this many milliseconds.
const TRICKLE_MS_PER_PERCENT: f64 = 2_000.0;

/// Expected duration of a whole job, stepped by entry count.
fn expected_job_duration(total_entries: usize) -> Duration {
    let ms = match total_entries {
        0..=99 => 2_000,
        100..=499 => 5_000,
        500..=999 => 10_000,
        1000..=1999 => 20_000,
        _ => 30_000,
    };
    Duration::from_millis(ms)
}

/// Expected duration of `stage` for a job of `total_entries`.
///
/// Small jobs stretch each stage so the whole job spans at least the
/// configured minimum duration.
pub fn expected_stage_duration(
    stage: Stage,
    total_entries: usize,
    since_job_start: Duration,
    config: &OrchestratorConfig,
) -> Duration {
    let stage_duration = expected_job_duration(total_entries).mul_f64(stage.weight());

    if config.is_small_job(total_entries) {
        let remaining_min = config.min_duration().saturating_sub(since_job_start);
        stage_duration.max(remaining_min / 5)
    } else {
        stage_duration
    }
}

/// Estimated absolute progress after `elapsed_in_stage` in `stage`.
///
/// The result lies in `[floor, ceiling - STAGE_CEILING_MARGIN]`.
pub fn estimate_progress(stage: Stage, elapsed_in_stage: Duration, expected: Duration) -> f64 {
    let (start, end) = stage.range();
    let elapsed_ms = elapsed_in_stage.as_secs_f64() * 1000.0;
    let expected_ms = (expected.as_secs_f64() * 1000.0).max(1.0);

    let stage_percent = (elapsed_ms / expected_ms * 100.0).min(STAGE_CAP_PERCENT);

    let value = start + (end - start) * stage_percent / 100.0;
    value.min(end - STAGE_CEILING_MARGIN)
}

/// Anti-stall step for progress that has not moved for `flat_for`.
///
/// Past the stall window, each tick adds a small share of the stage, up to
/// [`TRICKLE_CAP_PERCENT`] of it. Returns `None` when progress should stay put.
pub fn stall_nudge(
    stage: Stage,
    current: f64,
    flat_for: Duration,
    tick: Duration,
    stall_window: Duration,
) -> Option<f64> {
    if flat_for <= stall_window {
        return None;
    }

    let (start, end) = stage.range();
    let cap =
        (start + (end - start) * TRICKLE_CAP_PERCENT / 100.0).min(end - STAGE_CEILING_MARGIN);
    let step_percent = tick.as_secs_f64() * 1000.0 / TRICKLE_MS_PER_PERCENT;
    let next = (current + (end - start) * step_percent / 100.0).min(cap);

    (next > current).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_expected_duration_grows_with_entries() {
        let config = OrchestratorConfig::default();
        let late = Duration::from_secs(60);
        let mut last = Duration::ZERO;
        for total in [10, 150, 700, 1500, 10_000] {
            let d = expected_stage_duration(Stage::Generate, total, late, &config);
            assert!(d > last, "{total} entries: {d:?} <= {last:?}");
            last = d;
        }
    }

    #[test]
    fn test_expected_duration_uses_stage_weight() {
        let config = OrchestratorConfig::default();
        let late = Duration::from_secs(60);
        assert_eq!(
            expected_stage_duration(Stage::Generate, 1500, late, &config),
            ms(10_000)
        );
        assert_eq!(
            expected_stage_duration(Stage::Process, 1500, late, &config),
            ms(4_000)
        );
        assert_eq!(
            expected_stage_duration(Stage::Validate, 300, late, &config),
            ms(500)
        );
    }

    #[test]
    fn test_small_job_stretches_stage() {
        let config = OrchestratorConfig::default();
        // 2000ms * 0.1 = 200ms, but 1500ms of minimum remain: 1500 / 5 = 300ms.
        assert_eq!(
            expected_stage_duration(Stage::Validate, 10, Duration::ZERO, &config),
            ms(300)
        );
        assert_eq!(
            expected_stage_duration(Stage::Validate, 10, ms(1500), &config),
            ms(200)
        );
    }

    #[test]
    fn test_estimate_starts_at_floor() {
        let p = estimate_progress(Stage::Process, Duration::ZERO, ms(1000));
        assert_eq!(p, 20.0);
    }

    #[test]
    fn test_estimate_is_linear_until_cap() {
        let p = estimate_progress(Stage::Generate, ms(500), ms(1000));
        assert!((p - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_never_reaches_ceiling() {
        for stage in Stage::ALL {
            let p = estimate_progress(stage, Duration::from_secs(3600), ms(10));
            assert!(p < stage.ceiling(), "{stage}: {p}");
            assert!(p <= stage.ceiling() - STAGE_CEILING_MARGIN);
        }
    }

    #[test]
    fn test_estimate_caps_at_ninety_percent_of_stage() {
        let p = estimate_progress(Stage::Generate, ms(50_000), ms(1_000));
        assert!((p - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_stall_nudge_waits_for_stall_window() {
        assert_eq!(
            stall_nudge(Stage::Generate, 76.0, ms(2_000), ms(500), ms(2_000)),
            None
        );
        // 500ms tick at 2s per percent: a quarter percent of the 40 point stage.
        let p = stall_nudge(Stage::Generate, 76.0, ms(2_001), ms(500), ms(2_000)).unwrap();
        assert!((p - 76.1).abs() < 1e-9);
    }

    #[test]
    fn test_stall_nudge_moves_past_estimate_cap() {
        // The time-based estimate of a default-sized stage is stuck at its cap.
        let capped = estimate_progress(Stage::Generate, Duration::from_secs(60), ms(10_000));
        let later = estimate_progress(Stage::Generate, Duration::from_secs(120), ms(10_000));
        assert_eq!(capped, later);

        let mut p = capped;
        let mut flat_for = ms(2_500);
        while let Some(next) = stall_nudge(Stage::Generate, p, flat_for, ms(500), ms(2_000)) {
            assert!(next > p);
            p = next;
            flat_for += ms(500);
        }
        assert!(p > capped);
        assert!((p - 78.8).abs() < 1e-9);
        assert!(p < Stage::Generate.ceiling() - STAGE_CEILING_MARGIN);
    }

    #[test]
    fn test_stall_nudge_respects_small_stages() {
        let p = stall_nudge(Stage::Finalize, 99.85, Duration::from_secs(60), ms(500), ms(2_000));
        assert_eq!(p, None);
    }

    #[test]
    fn test_estimate_monotonic_in_time() {
        let mut last = 0.0;
        for t in (0..120_000).step_by(250) {
            let p = estimate_progress(Stage::Generate, ms(t), ms(90_000));
            assert!(p >= last, "t={t}: {p} < {last}");
            last = p;
        }
    }
}
