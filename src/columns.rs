//! Column-name contract for the wellness CSV export.
//!
//! The export's header names are Korean and the dashboard matches them
//! exactly; these constants are the single place they are spelled out.
//! If the export format ever changes, only this module moves.

/// Identity column: the email-like key for whose records a row belongs to.
pub const IDENTITY: &str = "EMAIL";

/// Summary-date column: the calendar day a row of daily aggregates covers.
pub const SUMMARY_DATE: &str = "요약 날짜";

/// Date-selector sentinel meaning "all dates".
pub const DATE_ALL: &str = "전체";

// Sleep-stage durations (hours)
pub const DEEP_SLEEP_TIME: &str = "깊은 수면 시간";
pub const REM_SLEEP_TIME: &str = "램수면 시간";
pub const TOTAL_SLEEP_TIME: &str = "잠 시간";

// Daily movement totals
pub const DAILY_DISTANCE: &str = "매일 움직인 거리";
pub const DAILY_STEPS: &str = "매일 걸음 수";

// Activity-intensity durations
pub const HIGH_ACTIVITY_TIME: &str = "고강도 활동 시간";
pub const MID_ACTIVITY_TIME: &str = "중강도 활동 시간";
pub const LOW_ACTIVITY_TIME: &str = "저강도 활동 시간";

/// Composite activity scores (0-100 scale)
pub const ACTIVITY_SCORE_LABELS: [&str; 5] = [
    "활동 점수",
    "활동 목표달성 점수",
    "활동 유지 점수",
    "운동 빈도 점수",
    "운동 볼륨 점수",
];

/// Composite sleep scores (0-100 scale)
pub const SLEEP_SCORE_LABELS: [&str; 6] = [
    "램수면 점수",
    "깊은 수면 점수",
    "수면 시기 점수",
    "수면 방해 점수",
    "수면 효율 점수",
    "수면 잠복 점수",
];

/// Sleep-stage columns feeding the sleep-time pie chart.
pub const SLEEP_TIME_LABELS: [&str; 3] = [DEEP_SLEEP_TIME, REM_SLEEP_TIME, TOTAL_SLEEP_TIME];

/// Movement columns feeding the distance/steps bar chart.
pub const DISTANCE_STEP_LABELS: [&str; 2] = [DAILY_DISTANCE, DAILY_STEPS];

/// Intensity columns feeding the activity-time bar chart.
pub const ACTIVITY_TIME_LABELS: [&str; 3] =
    [HIGH_ACTIVITY_TIME, MID_ACTIVITY_TIME, LOW_ACTIVITY_TIME];
