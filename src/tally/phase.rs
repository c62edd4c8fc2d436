use chrono::{DateTime, Duration, Utc};

// Phase boundaries are fixed offsets from the event start, not configurable
// per event. The evaluation phase runs from the voting boundary to the
// event's own end date.
pub const NOMINATION_DAYS: i64 = 7;
pub const VOTING_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Nomination,
    Voting,
    Evaluation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStatus {
    pub phase: Phase,
    // Elapsed fraction of the current phase window, 0-100.
    pub progress: f64,
}

// Classify `now` into one of the three sequential phases of an event.
//
// Intervals: nomination is [start, start+7d], voting is (start+7d,
// start+14d], evaluation is (start+14d, end]. Outside [start, end], or when
// either date is missing, there is no phase. Total over all inputs; a
// degenerate window (end before the voting boundary) cannot panic, it just
// never reaches the evaluation arm.
pub fn classify(
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<PhaseStatus> {
    let start = start_date?;
    let end = end_date?;

    if now < start || now > end {
        return None;
    }

    let nomination_end = start + Duration::days(NOMINATION_DAYS);
    let voting_end = start + Duration::days(VOTING_DAYS);

    let (phase, window_start, window_end) = if now <= nomination_end {
        (Phase::Nomination, start, nomination_end)
    } else if now <= voting_end {
        (Phase::Voting, nomination_end, voting_end)
    } else {
        (Phase::Evaluation, voting_end, end)
    };

    Some(PhaseStatus {
        phase,
        progress: progress_percent(window_start, window_end, now),
    })
}

fn progress_percent(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let total = (window_end - window_start).num_milliseconds();
    if total <= 0 {
        return 100.0;
    }
    let elapsed = (now - window_start).num_milliseconds();
    ((elapsed as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}
